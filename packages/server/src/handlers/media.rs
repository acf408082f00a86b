use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use poster_common::storage::{BlobStore, ContentHash, StorageError};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;
use crate::utils::filename::is_stored_name;

#[utoipa::path(
    get,
    path = "/{hash}/{name}",
    tag = "Media",
    operation_id = "getMedia",
    summary = "Download a poster file",
    description = "Streams a stored image or PDF. The URL comes from a poster's `image_url` or \
        `pdf_url`. Supports ETag-based caching via If-None-Match.",
    params(
        ("hash" = String, Path, description = "SHA-256 content hash (hex)"),
        ("name" = String, Path, description = "Stored file name, used for the content type"),
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn get_media(
    State(state): State<AppState>,
    Path((hash, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound("File not found".into());

    if !is_stored_name(&name) {
        return Err(not_found());
    }
    let hash: ContentHash = hash.parse().map_err(|_| not_found())?;

    build_blob_response(&hash, &name, &headers, &*state.blob_store).await
}

async fn build_blob_response(
    hash: &ContentHash,
    name: &str,
    headers: &HeaderMap,
    blob_store: &dyn BlobStore,
) -> Result<Response, AppError> {
    let etag_value = format!("\"{hash}\"");
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && val.split(',').any(|tag| {
            let tag = tag.trim();
            tag == etag_value || tag == "*"
        })
        && blob_store.exists(hash).await?
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let reader = match blob_store.get_stream(hash).await {
        Ok(reader) => reader,
        Err(StorageError::NotFound(_)) => {
            return Err(AppError::NotFound("File not found".into()));
        }
        Err(e) => return Err(e.into()),
    };
    let body = Body::from_stream(ReaderStream::new(reader));

    let content_type = mime_guess::from_path(name).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
