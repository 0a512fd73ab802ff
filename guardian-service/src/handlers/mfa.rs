//! Second-factor endpoints: verify an emailed code, or ask for a new one.

use axum::{extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::dtos::auth::TokenResponse;
use crate::dtos::mfa::{ResendCodeRequest, ResendCodeResponse, VerifyCodeRequest};
use crate::dtos::ErrorResponse;
use crate::handlers::auth::token_response;
use crate::services::{metrics, ServiceError};
use crate::AppState;

fn required(value: Option<String>, field: &'static str) -> Result<String, ServiceError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ServiceError::MissingField(field))
}

/// Verify an MFA code and start a session
#[utoipa::path(
    post,
    path = "/api/v1/mfa/verify-code",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Code accepted; tokens also set as cookies", body = TokenResponse),
        (status = 400, description = "mfa_token or code missing", body = ErrorResponse),
        (status = 401, description = "Invalid token or code", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Token generation failed", body = ErrorResponse)
    ),
    tag = "MFA"
)]
pub async fn verify_code(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<VerifyCodeRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let mfa_token = required(req.mfa_token, "mfa_token")?;
    let code = required(req.code, "code")?;

    let claims = match state.mfa.verify_code(&mfa_token, &code).await {
        Ok(claims) => {
            metrics::record_mfa_verification("success");
            claims
        }
        Err(e) => {
            metrics::record_mfa_verification("failure");
            return Err(e.into());
        }
    };

    let user = state.auth.mfa_verified(&claims.sub).await?;
    let tokens = state.auth.generate_tokens(&user)?;

    tracing::info!(user_id = %user.id, "Session started after MFA");
    Ok(token_response(&state, jar, tokens))
}

/// Send a fresh MFA code
#[utoipa::path(
    post,
    path = "/api/v1/mfa/resend-code",
    request_body = ResendCodeRequest,
    responses(
        (status = 200, description = "New code sent; use the returned token", body = ResendCodeResponse),
        (status = 400, description = "mfa_token missing", body = ErrorResponse),
        (status = 401, description = "Invalid or expired MFA token", body = ErrorResponse)
    ),
    tag = "MFA"
)]
pub async fn resend_code(
    State(state): State<AppState>,
    body: Option<Json<ResendCodeRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let mfa_token = required(req.mfa_token, "mfa_token")?;

    let mfa_token = state.mfa.resend_code(&mfa_token).await?;
    Ok(Json(ResendCodeResponse { mfa_token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_count_as_missing() {
        assert!(matches!(
            required(Some("   ".to_string()), "code"),
            Err(ServiceError::MissingField("code"))
        ));
        assert!(required(None, "mfa_token").is_err());
        assert_eq!(required(Some(" 123456 ".to_string()), "code").unwrap(), "123456");
    }
}
