use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::lost_articles::{CreateLostArticleRequest, UpdateLostArticleStatusRequest};
use crate::dtos::ErrorResponse;
use crate::middleware::AuthUser;
use crate::models::LostArticle;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Register a lost or found article
#[utoipa::path(
    post,
    path = "/api/v1/lost-articles",
    request_body = CreateLostArticleRequest,
    responses(
        (status = 201, description = "Article registered", body = LostArticle),
        (status = 400, description = "Invalid initial status", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Lost and Found",
    security(("bearer_auth" = []))
)]
pub async fn create_article(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateLostArticleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let article = state.lost_articles.create(&actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// The caller's own articles
#[utoipa::path(
    get,
    path = "/api/v1/lost-articles",
    responses((status = 200, description = "Articles, newest first", body = [LostArticle])),
    tag = "Lost and Found",
    security(("bearer_auth" = []))
)]
pub async fn list_own_articles(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.lost_articles.list_own(&actor).await?))
}

/// Every article currently marked FOUND
#[utoipa::path(
    get,
    path = "/api/v1/lost-articles/found",
    responses((status = 200, description = "Found articles, newest first", body = [LostArticle])),
    tag = "Lost and Found",
    security(("bearer_auth" = []))
)]
pub async fn list_found_articles(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.lost_articles.list_found().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/lost-articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article", body = LostArticle),
        (status = 403, description = "Not visible to caller", body = ErrorResponse),
        (status = 404, description = "Article not found", body = ErrorResponse)
    ),
    tag = "Lost and Found",
    security(("bearer_auth" = []))
)]
pub async fn get_article(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.lost_articles.get(&actor, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/lost-articles/{id}/status",
    params(("id" = Uuid, Path, description = "Article id")),
    request_body = UpdateLostArticleStatusRequest,
    responses(
        (status = 200, description = "Updated article", body = LostArticle),
        (status = 403, description = "Owner or officer only", body = ErrorResponse),
        (status = 404, description = "Article not found", body = ErrorResponse)
    ),
    tag = "Lost and Found",
    security(("bearer_auth" = []))
)]
pub async fn update_article_status(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLostArticleStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        state.lost_articles.update_status(&actor, id, req.status).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lost-articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Owner only", body = ErrorResponse),
        (status = 404, description = "Article not found", body = ErrorResponse)
    ),
    tag = "Lost and Found",
    security(("bearer_auth" = []))
)]
pub async fn delete_article(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.lost_articles.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
