//! User model - citizen and officer accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::{ColumnValue, Entity};

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    /// Stored lower-cased.
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,
    pub is_officer: bool,
    pub mfa_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, full_name: String, password_hash: String, is_officer: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            full_name,
            password_hash,
            is_officer,
            mfa_enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Entity for User {
    const TABLE: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("id", self.id.into()),
            ("email", self.email.clone().into()),
            ("full_name", self.full_name.clone().into()),
            ("password_hash", self.password_hash.clone().into()),
            ("is_officer", self.is_officer.into()),
            ("mfa_enabled", self.mfa_enabled.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ]
    }

    fn column_names() -> &'static [&'static str] {
        &[
            "id",
            "email",
            "full_name",
            "password_hash",
            "is_officer",
            "mfa_enabled",
            "created_at",
            "updated_at",
        ]
    }
}
