use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::AlertSeverity;
use crate::services::alerts::NewAlert;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAlertRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    #[schema(example = "Flooding on Riverside")]
    pub title: String,

    #[validate(length(min = 1, max = 2000, message = "Message is required"))]
    pub message: String,

    pub severity: AlertSeverity,

    #[validate(length(max = 200))]
    pub area: Option<String>,

    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CreateAlertRequest> for NewAlert {
    fn from(req: CreateAlertRequest) -> Self {
        Self {
            title: req.title,
            message: req.message,
            severity: req.severity,
            area: req.area,
            expires_at: req.expires_at,
        }
    }
}
