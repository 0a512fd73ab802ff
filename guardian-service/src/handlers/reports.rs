use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::reports::{CreateReportRequest, ReportQuery, UpdateReportStatusRequest};
use crate::dtos::ErrorResponse;
use crate::middleware::AuthUser;
use crate::models::Report;
use crate::utils::ValidatedJson;
use crate::AppState;

/// File an incident report
#[utoipa::path(
    post,
    path = "/api/v1/reports",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report filed", body = Report),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn create_report(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateReportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let report = state.reports.create(&actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// List reports
///
/// Citizens get their own reports; officers get every report.
#[utoipa::path(
    get,
    path = "/api/v1/reports",
    params(ReportQuery),
    responses((status = 200, description = "Reports, newest first", body = [Report])),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn list_reports(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reports.list(&actor, query.status).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report", body = Report),
        (status = 403, description = "Not your report", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse)
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn get_report(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reports.get(&actor, id).await?))
}

/// Change a report's status (officers only)
#[utoipa::path(
    patch,
    path = "/api/v1/reports/{id}/status",
    params(("id" = Uuid, Path, description = "Report id")),
    request_body = UpdateReportStatusRequest,
    responses(
        (status = 200, description = "Updated report", body = Report),
        (status = 403, description = "Officers only", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse)
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn update_report_status(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReportStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reports.update_status(&actor, id, req.status).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reports/{id}",
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not your report", body = ErrorResponse),
        (status = 404, description = "Report not found", body = ErrorResponse)
    ),
    tag = "Reports",
    security(("bearer_auth" = []))
)]
pub async fn delete_report(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.reports.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
