use std::collections::HashSet;
use std::io;

use axum::Json;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::TryStreamExt;
use poster_common::storage::{BoxReader, ContentHash, StorageError};
use tokio_util::io::StreamReader;
use tracing::{debug, info, instrument, warn};

use crate::entity::poster;
use crate::error::{AppError, ErrorBody};
use crate::extractors::admin::AdminKey;
use crate::extractors::origin::RequestOrigin;
use crate::models::poster::{
    EMPTY_FILE, INVALID_IMAGE, PosterForm, PosterListQuery, PosterResponse, VisibilityStatus,
    VisibilityStatusResponse,
};
use crate::models::shared::parse_include_hidden;
use crate::repository::{self, BlobRef, Visibility};
use crate::state::AppState;
use crate::utils::filename::sanitize_upload_name;
use crate::utils::media_url::MediaUrls;

#[utoipa::path(
    get,
    path = "/",
    tag = "Posters",
    operation_id = "listPosters",
    summary = "List posters",
    description = "Returns posters ordered by year (newest first), then by id descending. \
        Hidden posters are omitted unless `include_hidden` is `1`, `true`, `True` or `yes`.",
    params(PosterListQuery),
    responses(
        (status = 200, description = "Poster list", body = Vec<PosterResponse>),
    ),
)]
#[instrument(skip(state, origin, pairs))]
pub async fn list_posters(
    State(state): State<AppState>,
    origin: RequestOrigin,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<PosterResponse>>, AppError> {
    let query = PosterListQuery::from_pairs(pairs);
    let visibility = if parse_include_hidden(query.include_hidden.as_deref()) {
        Visibility::All
    } else {
        Visibility::VisibleOnly
    };

    let posters = repository::list(&state.db, visibility).await?;
    let urls = MediaUrls::new(&state.config.media);

    Ok(Json(
        posters
            .into_iter()
            .map(|p| PosterResponse::from_model(p, &urls, &origin))
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Posters",
    operation_id = "getPoster",
    summary = "Get a poster",
    description = "Returns a single poster, hidden or not.",
    params(("id" = i32, Path, description = "Poster ID")),
    responses(
        (status = 200, description = "Poster", body = PosterResponse),
        (status = 404, description = "Poster not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, origin), fields(id))]
pub async fn get_poster(
    State(state): State<AppState>,
    origin: RequestOrigin,
    Path(id): Path<i32>,
) -> Result<Json<PosterResponse>, AppError> {
    let model = find_poster(&state.db, id).await?;
    let urls = MediaUrls::new(&state.config.media);

    Ok(Json(PosterResponse::from_model(model, &urls, &origin)))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Posters",
    operation_id = "createPoster",
    summary = "Create a poster",
    description = "Creates a poster from a multipart form. `title`, `year` and the `image` file \
        are required; `award`, `type`, `area`, `description`, `hidden` and the `pdf` file are \
        optional.",
    request_body(content_type = "multipart/form-data", description = "Poster fields and files"),
    responses(
        (status = 201, description = "Poster created", body = PosterResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin key missing (ADMIN_KEY_MISSING)", body = ErrorBody),
        (status = 403, description = "Admin key invalid (ADMIN_KEY_INVALID)", body = ErrorBody),
        (status = 413, description = "Upload too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("admin_key" = [])),
)]
#[instrument(skip(state, admin_key, origin, multipart))]
pub async fn create_poster(
    admin_key: AdminKey,
    State(state): State<AppState>,
    origin: RequestOrigin,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    admin_key.require(&state.config.auth.admin_key)?;
    let multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;

    let form = read_poster_form(&state, multipart).await?;
    let written = form.written.clone();

    let created = async {
        let new = form.into_new_poster()?;
        Ok::<_, AppError>(repository::insert(&state.db, new).await?)
    }
    .await;

    // Drops the blobs of a rejected form, plus any duplicate parts that lost.
    release_unreferenced(&state, written).await;
    let model = created?;

    info!(poster_id = model.id, title = %model.title, "Poster created");

    let urls = MediaUrls::new(&state.config.media);
    Ok((
        StatusCode::CREATED,
        Json(PosterResponse::from_model(model, &urls, &origin)),
    ))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Posters",
    operation_id = "updatePoster",
    summary = "Update a poster",
    description = "Partially updates a poster from a multipart form. Only supplied fields \
        change. An empty `pdf` text part removes the PDF. Also served as PUT with the same \
        partial semantics.",
    params(("id" = i32, Path, description = "Poster ID")),
    request_body(content_type = "multipart/form-data", description = "Fields to change"),
    responses(
        (status = 200, description = "Poster updated", body = PosterResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin key missing (ADMIN_KEY_MISSING)", body = ErrorBody),
        (status = 403, description = "Admin key invalid (ADMIN_KEY_INVALID)", body = ErrorBody),
        (status = 404, description = "Poster not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "Upload too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("admin_key" = [])),
)]
#[instrument(skip(state, admin_key, origin, multipart), fields(id))]
pub async fn update_poster(
    admin_key: AdminKey,
    State(state): State<AppState>,
    origin: RequestOrigin,
    Path(id): Path<i32>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PosterResponse>, AppError> {
    admin_key.require(&state.config.auth.admin_key)?;
    let multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;

    let existing = find_poster(&state.db, id).await?;
    let form = read_poster_form(&state, multipart).await?;

    let mut candidates = form.written.clone();
    let updated = async {
        let changes = form.into_changes()?;
        repository::update(&state.db, id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Poster not found".into()))
    }
    .await;

    if updated.is_ok() {
        candidates.extend(blob_hashes(&existing));
    }
    release_unreferenced(&state, candidates).await;
    let model = updated?;

    info!(poster_id = model.id, "Poster updated");

    let urls = MediaUrls::new(&state.config.media);
    Ok(Json(PosterResponse::from_model(model, &urls, &origin)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Posters",
    operation_id = "deletePoster",
    summary = "Delete a poster",
    description = "Permanently removes a poster. Files no other poster uses are deleted too.",
    params(("id" = i32, Path, description = "Poster ID")),
    responses(
        (status = 204, description = "Poster deleted"),
        (status = 401, description = "Admin key missing (ADMIN_KEY_MISSING)", body = ErrorBody),
        (status = 403, description = "Admin key invalid (ADMIN_KEY_INVALID)", body = ErrorBody),
        (status = 404, description = "Poster not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("admin_key" = [])),
)]
#[instrument(skip(state, admin_key), fields(id))]
pub async fn delete_poster(
    admin_key: AdminKey,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    admin_key.require(&state.config.auth.admin_key)?;

    let removed = repository::delete(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Poster not found".into()))?;

    info!(poster_id = removed.id, "Poster deleted");
    release_unreferenced(&state, blob_hashes(&removed)).await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/hide",
    tag = "Posters",
    operation_id = "hidePoster",
    summary = "Hide a poster",
    description = "Excludes the poster from the default listing. It stays reachable by id.",
    params(("id" = i32, Path, description = "Poster ID")),
    responses(
        (status = 200, description = "Poster hidden", body = VisibilityStatusResponse),
        (status = 401, description = "Admin key missing (ADMIN_KEY_MISSING)", body = ErrorBody),
        (status = 403, description = "Admin key invalid (ADMIN_KEY_INVALID)", body = ErrorBody),
        (status = 404, description = "Poster not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("admin_key" = [])),
)]
#[instrument(skip(state, admin_key), fields(id))]
pub async fn hide_poster(
    admin_key: AdminKey,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<VisibilityStatusResponse>, AppError> {
    admin_key.require(&state.config.auth.admin_key)?;
    set_visibility(&state, id, VisibilityStatus::Hidden).await
}

#[utoipa::path(
    post,
    path = "/{id}/unhide",
    tag = "Posters",
    operation_id = "unhidePoster",
    summary = "Unhide a poster",
    description = "Returns the poster to the default listing.",
    params(("id" = i32, Path, description = "Poster ID")),
    responses(
        (status = 200, description = "Poster visible", body = VisibilityStatusResponse),
        (status = 401, description = "Admin key missing (ADMIN_KEY_MISSING)", body = ErrorBody),
        (status = 403, description = "Admin key invalid (ADMIN_KEY_INVALID)", body = ErrorBody),
        (status = 404, description = "Poster not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("admin_key" = [])),
)]
#[instrument(skip(state, admin_key), fields(id))]
pub async fn unhide_poster(
    admin_key: AdminKey,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<VisibilityStatusResponse>, AppError> {
    admin_key.require(&state.config.auth.admin_key)?;
    set_visibility(&state, id, VisibilityStatus::Visible).await
}

async fn set_visibility(
    state: &AppState,
    id: i32,
    status: VisibilityStatus,
) -> Result<Json<VisibilityStatusResponse>, AppError> {
    let hidden = status == VisibilityStatus::Hidden;
    repository::set_hidden(&state.db, id, hidden)
        .await?
        .ok_or_else(|| AppError::NotFound("Poster not found".into()))?;

    info!(poster_id = id, hidden, "Poster visibility changed");
    Ok(Json(VisibilityStatusResponse { status }))
}

async fn find_poster<C: sea_orm::ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<poster::Model, AppError> {
    repository::get(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Poster not found".into()))
}

fn blob_hashes(model: &poster::Model) -> Vec<ContentHash> {
    std::iter::once(model.image_hash.as_str())
        .chain(model.pdf_hash.as_deref())
        .filter_map(|hex| ContentHash::from_hex(hex).ok())
        .collect()
}

/// Delete each blob in `hashes` that no poster references any more.
///
/// Best effort: failures are logged and otherwise ignored.
async fn release_unreferenced(state: &AppState, hashes: Vec<ContentHash>) {
    let mut seen = HashSet::new();
    for hash in hashes {
        if !seen.insert(hash) {
            continue;
        }

        let hex = hash.to_hex();
        match repository::blob_in_use(&state.db, &hex).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                warn!(%hash, error = %e, "Skipping blob cleanup, reference check failed");
                continue;
            }
        }

        match state.blob_store.delete(&hash).await {
            Ok(true) => debug!(%hash, "Released unreferenced blob"),
            Ok(false) => {}
            Err(e) => warn!(%hash, error = %e, "Failed to delete unreferenced blob"),
        }
    }
}

/// Read every part of a poster form, storing file parts as they arrive.
///
/// On a transport error the blobs written so far are released before
/// returning.
async fn read_poster_form(state: &AppState, mut multipart: Multipart) -> Result<PosterForm, AppError> {
    let mut form = PosterForm::default();
    match collect_parts(state, &mut multipart, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            release_unreferenced(state, std::mem::take(&mut form.written)).await;
            Err(e)
        }
    }
}

async fn collect_parts(
    state: &AppState,
    multipart: &mut Multipart,
    form: &mut PosterForm,
) -> Result<(), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if !PosterForm::FIELDS.contains(&name.as_str()) {
            continue;
        }

        match (name.as_str(), field.file_name().map(str::to_owned)) {
            ("image", Some(original)) => {
                let is_image = mime_guess::from_path(&original)
                    .first()
                    .is_some_and(|m| m.type_() == mime_guess::mime::IMAGE);
                if !is_image {
                    form.reject("image", INVALID_IMAGE);
                    continue;
                }
                let stored = sanitize_upload_name(&original, "image", "jpg");
                if let Some(blob) = store_upload(state, field, form, "image", stored).await? {
                    form.image = Some(blob);
                }
            }
            ("pdf", Some(original)) => {
                let stored = sanitize_upload_name(&original, "document", "pdf");
                if let Some(blob) = store_upload(state, field, form, "pdf", stored).await? {
                    form.pdf = Some(Some(blob));
                }
            }
            _ => {
                let text = field.text().await.map_err(|e| multipart_error(&e))?;
                form.set_text(&name, &text);
            }
        }
    }
    Ok(())
}

async fn store_upload(
    state: &AppState,
    field: Field<'_>,
    form: &mut PosterForm,
    field_name: &str,
    stored_name: String,
) -> Result<Option<BlobRef>, AppError> {
    // The store enforces max_blob_size while it hashes and stages the bytes.
    let reader: BoxReader<'_> = Box::new(StreamReader::new(Box::pin(
        field.map_err(io::Error::other),
    )));
    let hash = state
        .blob_store
        .put_stream(reader)
        .await
        .map_err(upload_error)?;
    form.written.push(hash);

    if hash == ContentHash::compute(b"") {
        form.reject(field_name, EMPTY_FILE);
        return Ok(None);
    }

    Ok(Some(BlobRef {
        hash: hash.to_hex(),
        name: stored_name,
    }))
}

fn multipart_error(err: &MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(format!("Multipart error: {}", err.body_text()))
    }
}

/// A body that breaks off mid-file surfaces from the store as an IO error
/// wrapping the multipart error; report it as the client's fault.
fn upload_error(err: StorageError) -> AppError {
    if let StorageError::Io(io_err) = &err
        && let Some(multipart) = io_err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MultipartError>())
    {
        return multipart_error(multipart);
    }
    err.into()
}
