//! Uploads and token-gated downloads of report and article attachments.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::files::{FileTokenRequest, FileTokenResponse, UploadResponse};
use crate::dtos::ErrorResponse;
use crate::middleware::AuthUser;
use crate::services::storage::{content_type_for, key_owner, sanitize_key, upload_key};
use crate::services::{metrics, ServiceError};
use crate::utils::ValidatedJson;
use crate::AppState;

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(anyhow::anyhow!("Upload exceeds the size limit"))
    } else {
        AppError::BadRequest(anyhow::anyhow!("Invalid multipart body: {}", e.body_text()))
    }
}

/// Upload a file
///
/// Expects a multipart body with a `file` part. The response carries a
/// short-lived token that can be used to fetch the file back.
#[utoipa::path(
    post,
    path = "/api/v1/files",
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "No file part", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    tag = "Files",
    security(("bearer_auth" = []))
)]
pub async fn upload(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let limit = state.config.files.max_upload_bytes;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let key = upload_key(actor.user_id, field.file_name());
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Uploaded file is empty")));
        }
        if data.len() > limit {
            return Err(ServiceError::PayloadTooLarge(limit).into());
        }

        let size = data.len();
        state.storage.upload(&key, data.to_vec()).await?;
        metrics::record_file_upload(size);

        let ttl = state.file_tokens.default_ttl_seconds();
        let token = state
            .file_tokens
            .generate_file_token(&key, &actor.user_id.to_string(), ttl)?;

        tracing::info!(user_id = %actor.user_id, bytes = size, "File uploaded");
        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                file_path: key,
                token,
                expires_in: ttl,
            }),
        ));
    }

    Err(AppError::BadRequest(anyhow::anyhow!("file is required")))
}

/// Mint a read token for a stored file
///
/// Owners may mint tokens for their own files; officers for any file.
#[utoipa::path(
    post,
    path = "/api/v1/files/token",
    request_body = FileTokenRequest,
    responses(
        (status = 200, description = "Token minted", body = FileTokenResponse),
        (status = 400, description = "Invalid path", body = ErrorResponse),
        (status = 403, description = "Not your file", body = ErrorResponse)
    ),
    tag = "Files",
    security(("bearer_auth" = []))
)]
pub async fn create_token(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(req): ValidatedJson<FileTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    sanitize_key(&req.file_path)?;

    if key_owner(&req.file_path) != Some(actor.user_id) && !actor.is_officer {
        return Err(ServiceError::Forbidden("You do not have access to this file".to_string()).into());
    }

    let ttl = state.file_tokens.default_ttl_seconds();
    let token = state
        .file_tokens
        .generate_file_token(&req.file_path, &actor.user_id.to_string(), ttl)?;

    Ok(Json(FileTokenResponse {
        token,
        expires_in: ttl,
    }))
}

/// Download a file with a file token
#[utoipa::path(
    get,
    path = "/api/v1/files/{token}",
    params(("token" = String, Path, description = "File access token")),
    responses(
        (status = 200, description = "File contents"),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    ),
    tag = "Files"
)]
pub async fn serve(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let grant = state.file_tokens.get_file_name_from_token(&token)?;
    let data = state.storage.download(&grant.file_path).await?;

    tracing::debug!(actor = %grant.actor_id, "Serving file");
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&grant.file_path)),
            (header::CONTENT_DISPOSITION, "inline"),
            (header::CACHE_CONTROL, "private, no-store"),
        ],
        data,
    ))
}
