use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use refly_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent `{error, code}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from the service layer.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A request body that failed `validator` checks.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

fn internal(detail: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %detail, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", core.to_string())
                }
                CoreError::StorageQuotaExceeded { .. } => (
                    StatusCode::FORBIDDEN,
                    "STORAGE_QUOTA_EXCEEDED",
                    core.to_string(),
                ),
                CoreError::Params(msg) => (StatusCode::BAD_REQUEST, "PARAMS_ERROR", msg.clone()),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::DuplicationNotAllowed { .. } => (
                    StatusCode::FORBIDDEN,
                    "DUPLICATION_NOT_ALLOWED",
                    core.to_string(),
                ),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Storage(_) | CoreError::Database(_) | CoreError::Internal(_) => {
                    internal(core)
                }
            },

            // --- HTTP-specific errors ---
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                errors.to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
