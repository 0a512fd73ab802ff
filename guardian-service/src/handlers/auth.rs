//! Registration, password login, token refresh and logout.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use secrecy::Secret;
use service_core::error::AppError;

use crate::dtos::auth::{
    LoginRequest, MfaRequiredResponse, RefreshRequest, RegisterRequest, RegisterResponse,
    TokenResponse,
};
use crate::dtos::{ErrorResponse, MessageResponse};
use crate::services::{LoginOutcome, NewAccount, TokenPair};
use crate::utils::cookies::{clear_auth_cookies, set_auth_cookies, REFRESH_TOKEN_COOKIE};
use crate::utils::ValidatedJson;
use crate::AppState;

/// Set both cookies and echo the pair in the body.
pub(crate) fn token_response(state: &AppState, jar: CookieJar, tokens: TokenPair) -> (CookieJar, Json<TokenResponse>) {
    let jar = set_auth_cookies(jar, &tokens, &state.config.cookies, &state.config.jwt);
    (
        jar,
        Json(TokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }),
    )
}

/// Create a citizen account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth
        .register(NewAccount {
            email: req.email,
            password: Secret::new(req.password),
            full_name: req.full_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id.to_string(),
        }),
    ))
}

/// Login with email and password
///
/// Accounts with MFA enabled receive an MFA token and an emailed code
/// instead of session tokens.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "MFA challenge issued", body = MfaRequiredResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Response, AppError> {
    let outcome = state
        .auth
        .login(&req.email, &Secret::new(req.password))
        .await?;

    Ok(match outcome {
        LoginOutcome::MfaRequired { mfa_token } => Json(MfaRequiredResponse {
            mfa_required: true,
            mfa_token,
        })
        .into_response(),
        LoginOutcome::Authenticated { tokens, .. } => {
            token_response(&state, jar, tokens).into_response()
        }
    })
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenResponse),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let from_body = body
        .and_then(|Json(req)| req.refresh_token)
        .filter(|token| !token.is_empty());
    let refresh_token = from_body
        .or_else(|| jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Refresh token is required")))?;

    let tokens = state.auth.refresh(&refresh_token).await?;
    Ok(token_response(&state, jar, tokens))
}

/// Clear the auth cookies
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    ),
    tag = "Authentication"
)]
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        clear_auth_cookies(jar),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}
