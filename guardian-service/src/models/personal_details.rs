use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::{ColumnValue, Entity};

/// Contact and identity details a user keeps on file; one row per user.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct PersonalDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub emergency_contact: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for PersonalDetails {
    const TABLE: &'static str = "personal_details";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("id", self.id.into()),
            ("user_id", self.user_id.into()),
            ("full_name", self.full_name.clone().into()),
            ("phone", self.phone.clone().into()),
            ("address", self.address.clone().into()),
            ("date_of_birth", self.date_of_birth.clone().into()),
            ("emergency_contact", self.emergency_contact.clone().into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ]
    }

    fn column_names() -> &'static [&'static str] {
        &[
            "id",
            "user_id",
            "full_name",
            "phone",
            "address",
            "date_of_birth",
            "emergency_contact",
            "created_at",
            "updated_at",
        ]
    }
}
