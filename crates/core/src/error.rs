/// Domain-level error shared by every Refly crate.
///
/// The API layer maps each variant onto an HTTP status and a stable error
/// code; lower layers convert their own failures (sqlx, S3) into the
/// `Database` / `Storage` variants.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Storage quota exceeded: {needed} object(s) needed, {available} available")]
    StorageQuotaExceeded { needed: i64, available: i64 },

    #[error("Invalid parameters: {0}")]
    Params(String),

    #[error("Duplication is not allowed for share {share_id}")]
    DuplicationNotAllowed { share_id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Object storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether this error means the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization failed: {err}"))
    }
}

/// Convenience alias used throughout the workspace.
pub type CoreResult<T> = Result<T, CoreError>;
