use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "citizen@example.com")]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    #[schema(example = "s3cure-passw0rd", min_length = 8)]
    pub password: String,

    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    #[schema(example = "Casey Citizen")]
    pub full_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub user_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "citizen@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "s3cure-passw0rd")]
    pub password: String,
}

/// Returned by login when a second factor is still owed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MfaRequiredResponse {
    pub mfa_required: bool,
    pub mfa_token: String,
}

/// Access and refresh tokens; the same values are also set as cookies.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefreshRequest {
    /// Falls back to the refresh cookie when absent.
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}
