use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use poster_common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `ADMIN_KEY_MISSING`,
    /// `ADMIN_KEY_INVALID`, `NOT_FOUND`, `PAYLOAD_TOO_LARGE`, `STORAGE_UNAVAILABLE`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Invalid fields: image, year")]
    pub message: String,
    /// Per-field messages, present only for form validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// One message per offending form field.
    InvalidFields(BTreeMap<String, String>),
    AdminKeyMissing,
    AdminKeyInvalid,
    NotFound(String),
    PayloadTooLarge(String),
    /// The database or blob store could not be reached.
    StorageUnavailable(String),
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) => StatusCode::BAD_REQUEST,
            AppError::AdminKeyMissing => StatusCode::UNAUTHORIZED,
            AppError::AdminKeyInvalid => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_body(self) -> ErrorBody {
        let (code, message, fields) = match self {
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg, None),
            AppError::InvalidFields(fields) => {
                let names: Vec<&str> = fields.keys().map(String::as_str).collect();
                let message = format!("Invalid fields: {}", names.join(", "));
                ("VALIDATION_ERROR", message, Some(fields))
            }
            AppError::AdminKeyMissing => (
                "ADMIN_KEY_MISSING",
                "X-Admin-Key header is required".into(),
                None,
            ),
            AppError::AdminKeyInvalid => ("ADMIN_KEY_INVALID", "Invalid admin key".into(), None),
            AppError::NotFound(msg) => ("NOT_FOUND", msg, None),
            AppError::PayloadTooLarge(msg) => ("PAYLOAD_TOO_LARGE", msg, None),
            AppError::StorageUnavailable(detail) => {
                tracing::error!("Storage unavailable: {}", detail);
                (
                    "STORAGE_UNAVAILABLE",
                    "Storage is temporarily unavailable".into(),
                    None,
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".into(),
                    None,
                )
            }
        };
        ErrorBody {
            code,
            message,
            fields,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.into_body())).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => {
                AppError::StorageUnavailable(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound("File not found".into()),
            StorageError::SizeLimitExceeded { limit, .. } => {
                AppError::PayloadTooLarge(format!("File exceeds maximum size of {limit} bytes"))
            }
            StorageError::InvalidHash(msg) => AppError::Validation(msg),
            StorageError::Io(e) => AppError::StorageUnavailable(e.to_string()),
        }
    }
}
