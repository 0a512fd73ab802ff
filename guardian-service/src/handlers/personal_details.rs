use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::dtos::personal_details::PersonalDetailsRequest;
use crate::dtos::ErrorResponse;
use crate::middleware::AuthUser;
use crate::models::PersonalDetails;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Get the caller's personal details
#[utoipa::path(
    get,
    path = "/api/v1/personal-details",
    responses(
        (status = 200, description = "Personal details", body = PersonalDetails),
        (status = 404, description = "No details on file", body = ErrorResponse)
    ),
    tag = "Personal Details",
    security(("bearer_auth" = []))
)]
pub async fn get_details(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.personal_details.get(actor.user_id).await?))
}

/// Create or replace the caller's personal details
#[utoipa::path(
    put,
    path = "/api/v1/personal-details",
    request_body = PersonalDetailsRequest,
    responses(
        (status = 200, description = "Saved", body = PersonalDetails),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Personal Details",
    security(("bearer_auth" = []))
)]
pub async fn put_details(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(req): ValidatedJson<PersonalDetailsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let details = state
        .personal_details
        .upsert(actor.user_id, req.into())
        .await?;
    Ok(Json(details))
}

/// Delete the caller's personal details
#[utoipa::path(
    delete,
    path = "/api/v1/personal-details",
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No details on file", body = ErrorResponse)
    ),
    tag = "Personal Details",
    security(("bearer_auth" = []))
)]
pub async fn delete_details(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    state.personal_details.delete(actor.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
