//! Account settings and officer role management.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use secrecy::Secret;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::users::{UpdateMfaRequest, UpdateRoleRequest};
use crate::dtos::ErrorResponse;
use crate::middleware::AuthUser;
use crate::models::User;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Switch the emailed second factor on or off for the caller
#[utoipa::path(
    put,
    path = "/api/v1/account/mfa",
    request_body = UpdateMfaRequest,
    responses(
        (status = 200, description = "Updated account", body = User),
        (status = 403, description = "Password is incorrect", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Account",
    security(("bearer_auth" = []))
)]
pub async fn update_mfa(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateMfaRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth
        .set_mfa_enabled(actor.user_id, &Secret::new(req.password), req.enabled)
        .await?;
    Ok(Json(user))
}

/// Grant or revoke the officer role (officers only)
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/role",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated account", body = User),
        (status = 403, description = "Officers only", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Account",
    security(("bearer_auth" = []))
)]
pub async fn update_role(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.auth.set_officer(&actor, id, req.is_officer).await?))
}
