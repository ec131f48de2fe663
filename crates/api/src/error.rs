use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use storyflam_core::error::CoreError;
use storyflam_core::locking::{LockError, StoreError};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`LockError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `storyflam_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A story lock operation failed.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Lock errors ---
            AppError::Lock(err) => classify_lock_error(err),

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a lock failure.
///
/// Conflicts are expected outcomes the editor UI branches on, so each gets
/// its own code under 409.
fn classify_lock_error(err: &LockError) -> (StatusCode, &'static str, String) {
    match err {
        LockError::Conflict { .. } => (StatusCode::CONFLICT, "LOCK_CONFLICT", err.to_string()),
        LockError::NotHeld => (StatusCode::CONFLICT, "LOCK_NOT_HELD", err.to_string()),
        LockError::Contended => (StatusCode::CONFLICT, "LOCK_CONTENDED", err.to_string()),
        LockError::DataAccess(StoreError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
        }
        LockError::DataAccess(StoreError::Backend(msg)) => {
            tracing::error!(error = %msg, "Lock store error");
            internal()
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Check constraint violations map to 400.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL check constraint violation: error code 23514
            if db_err.code().as_deref() == Some("23514") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                return (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Value violates check constraint: {constraint}"),
                );
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
