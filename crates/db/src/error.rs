//! Conversion of `sqlx` errors into domain errors.

use refly_core::error::CoreError;

/// Map a `sqlx::Error` to `CoreError`. Unique violations become `Conflict`.
pub fn db_error(err: sqlx::Error) -> CoreError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            return CoreError::Conflict(db.message().to_string());
        }
    }
    CoreError::Database(err.to_string())
}
