//! Incident reports filed by citizens and triaged by officers.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::{ColumnValue, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Submitted,
    InReview,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Submitted => "SUBMITTED",
            ReportStatus::InReview => "IN_REVIEW",
            ReportStatus::Resolved => "RESOLVED",
            ReportStatus::Dismissed => "DISMISSED",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUBMITTED" => Ok(ReportStatus::Submitted),
            "IN_REVIEW" => Ok(ReportStatus::InReview),
            "RESOLVED" => Ok(ReportStatus::Resolved),
            "DISMISSED" => Ok(ReportStatus::Dismissed),
            other => Err(format!("Unknown report status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    /// PII-scrubbed before storage.
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    /// One of `ReportStatus`, stored as text.
    pub status: String,
    pub attachment_path: Option<String>,
    pub assigned_officer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Report {
    const TABLE: &'static str = "reports";

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
            ("title", self.title.clone().into()),
            ("description", self.description.clone().into()),
            ("category", self.category.clone().into()),
            ("location", self.location.clone().into()),
            ("status", self.status.clone().into()),
            ("attachment_path", self.attachment_path.clone().into()),
            ("assigned_officer_id", self.assigned_officer_id.into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ]
    }

    fn column_names() -> &'static [&'static str] {
        &[
            "id",
            "user_id",
            "title",
            "description",
            "category",
            "location",
            "status",
            "attachment_path",
            "assigned_officer_id",
            "created_at",
            "updated_at",
        ]
    }
}
