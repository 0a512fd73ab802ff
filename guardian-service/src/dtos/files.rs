use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000/0d7c2f8e-1b1a-4a53-9d0c-7f3f5b8f8a11.jpg")]
    pub file_path: String,
    pub token: String,
    /// Seconds until `token` expires
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FileTokenRequest {
    #[validate(length(min = 1, max = 512, message = "file_path is required"))]
    pub file_path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileTokenResponse {
    pub token: String,
    pub expires_in: i64,
}
