pub mod alerts;
pub mod auth;
pub mod files;
pub mod lost_articles;
pub mod mfa;
pub mod personal_details;
pub mod reports;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Shape of every error body; mirrors `service_core::error::ErrorBody`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "mfa_token is required")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Logged out")]
    pub message: String,
}
