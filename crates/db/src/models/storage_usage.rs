use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Object quota applied to users without a `storage_usages` row.
pub const DEFAULT_OBJECT_QUOTA: i64 = 1000;

/// Per-user object counter from `storage_usages`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub uid: String,
    pub object_count: i64,
    pub object_quota: i64,
}

impl StorageUsage {
    pub fn empty(uid: impl Into<String>, object_quota: i64) -> Self {
        Self {
            uid: uid.into(),
            object_count: 0,
            object_quota,
        }
    }

    pub fn available(&self) -> i64 {
        refly_core::quota::available(self.object_count, self.object_quota)
    }
}
