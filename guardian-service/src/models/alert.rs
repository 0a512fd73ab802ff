//! Safety alerts broadcast by officers.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::{ColumnValue, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Ok(AlertSeverity::Info),
            "WARNING" => Ok(AlertSeverity::Warning),
            "CRITICAL" => Ok(AlertSeverity::Critical),
            other => Err(format!("Unknown alert severity: {}", other)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Alert {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub area: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Alert {
    const TABLE: &'static str = "alerts";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn columns(&self) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("id", self.id.into()),
            ("author_id", self.author_id.into()),
            ("title", self.title.clone().into()),
            ("message", self.message.clone().into()),
            ("severity", self.severity.clone().into()),
            ("area", self.area.clone().into()),
            ("expires_at", self.expires_at.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ]
    }

    fn column_names() -> &'static [&'static str] {
        &[
            "id",
            "author_id",
            "title",
            "message",
            "severity",
            "area",
            "expires_at",
            "created_at",
            "updated_at",
        ]
    }
}
