//! Lost and found articles.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::{ColumnValue, Entity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LostArticleStatus {
    Lost,
    Found,
    Returned,
}

impl LostArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LostArticleStatus::Lost => "LOST",
            LostArticleStatus::Found => "FOUND",
            LostArticleStatus::Returned => "RETURNED",
        }
    }
}

impl fmt::Display for LostArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LostArticleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOST" => Ok(LostArticleStatus::Lost),
            "FOUND" => Ok(LostArticleStatus::Found),
            "RETURNED" => Ok(LostArticleStatus::Returned),
            other => Err(format!("Unknown article status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct LostArticle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub status: String,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LostArticle {
    /// Found articles are visible to every authenticated user.
    pub fn is_found(&self) -> bool {
        self.status == LostArticleStatus::Found.as_str()
    }
}

impl Entity for LostArticle {
    const TABLE: &'static str = "lost_articles";

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
            ("name", self.name.clone().into()),
            ("description", self.description.clone().into()),
            ("category", self.category.clone().into()),
            ("location", self.location.clone().into()),
            ("status", self.status.clone().into()),
            ("image_path", self.image_path.clone().into()),
            ("created_at", self.created_at.into()),
            ("updated_at", self.updated_at.into()),
        ]
    }

    fn column_names() -> &'static [&'static str] {
        &[
            "id",
            "user_id",
            "name",
            "description",
            "category",
            "location",
            "status",
            "image_path",
            "created_at",
            "updated_at",
        ]
    }
}
