//! Tunables for the service layer.

use refly_db::models::storage_usage::DEFAULT_OBJECT_QUOTA;

/// Default fan-out for entity duplication.
pub const DEFAULT_DUPLICATE_CONCURRENCY: usize = 10;
/// Default fan-out for child share creation.
pub const DEFAULT_SHARE_CONCURRENCY: usize = 5;
/// Default fan-out for drive file copies.
pub const DEFAULT_DRIVE_FILE_CONCURRENCY: usize = 3;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub duplicate_concurrency: usize,
    pub share_concurrency: usize,
    pub drive_file_concurrency: usize,
    /// Object quota for users without a usage row.
    pub default_object_quota: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            duplicate_concurrency: DEFAULT_DUPLICATE_CONCURRENCY,
            share_concurrency: DEFAULT_SHARE_CONCURRENCY,
            drive_file_concurrency: DEFAULT_DRIVE_FILE_CONCURRENCY,
            default_object_quota: DEFAULT_OBJECT_QUOTA,
        }
    }
}
