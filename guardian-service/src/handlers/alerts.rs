use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::alerts::CreateAlertRequest;
use crate::dtos::ErrorResponse;
use crate::middleware::AuthUser;
use crate::models::Alert;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Publish a safety alert (officers only)
#[utoipa::path(
    post,
    path = "/api/v1/alerts",
    request_body = CreateAlertRequest,
    responses(
        (status = 201, description = "Alert published", body = Alert),
        (status = 403, description = "Officers only", body = ErrorResponse)
    ),
    tag = "Alerts",
    security(("bearer_auth" = []))
)]
pub async fn create_alert(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateAlertRequest>,
) -> Result<impl IntoResponse, AppError> {
    let alert = state.alerts.create(&actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

/// Active safety alerts
#[utoipa::path(
    get,
    path = "/api/v1/alerts",
    responses((status = 200, description = "Unexpired alerts, newest first", body = [Alert])),
    tag = "Alerts",
    security(("bearer_auth" = []))
)]
pub async fn list_alerts(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.alerts.list_active().await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/alerts/{id}",
    params(("id" = Uuid, Path, description = "Alert id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Officers only", body = ErrorResponse),
        (status = 404, description = "Alert not found", body = ErrorResponse)
    ),
    tag = "Alerts",
    security(("bearer_auth" = []))
)]
pub async fn delete_alert(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.alerts.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
