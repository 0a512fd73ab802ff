use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fields are optional so a missing value is reported as a 400 naming it,
/// rather than a generic JSON rejection.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub mfa_token: Option<String>,
    #[serde(default)]
    #[schema(example = "123456")]
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ResendCodeRequest {
    #[serde(default)]
    pub mfa_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResendCodeResponse {
    pub mfa_token: String,
}
