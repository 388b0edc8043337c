//! Upload Handlers

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use http::{HeaderMap, StatusCode, header};
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::services::UploadTicket;
use crate::services::blob_store::validate_image;
use crate::utils::{ApiResponse, AppResult, ok};

/// Stored upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub blob_id: String,
    pub url: String,
    pub size: usize,
    pub content_type: String,
}

/// Issue a one-time upload URL
pub async fn request_upload_url(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<UploadTicket>> {
    let ticket = state.blob_store.generate_upload_url();
    tracing::debug!(user_id = %user.id, expires_at = ticket.expires_at, "Upload URL issued");
    Ok(ok(ticket))
}

/// Store the request body under a one-time token
///
/// The body is validated before the token is spent, so a rejected file can be
/// retried with the same URL.
pub async fn upload_with_token(
    State(state): State<ServerState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<ApiResponse<UploadResponse>> {
    let declared = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let content_type = validate_image(&body, declared)?;

    state.blob_store.consume_upload_token(&token)?;
    let blob_id = state.blob_store.put(&body, content_type)?;

    Ok(ok(UploadResponse {
        url: state.blob_store.resolve_url(&blob_id),
        blob_id,
        size: body.len(),
        content_type: content_type.to_string(),
    }))
}

/// Serve a stored blob
pub async fn serve_blob(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let blob = state.blob_store.read(&id)?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, blob.content_type),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        blob.bytes,
    )
        .into_response())
}
