//! Storage quota guard.
//!
//! One read of the usage row, no reservation: two concurrent requests from
//! the same user can both pass.

use refly_core::error::CoreResult;
use refly_core::quota::ensure_available;
use refly_db::Store;

/// Fail with `StorageQuotaExceeded` unless `uid` can store `needed` more
/// objects.
pub async fn check_storage_quota(store: &dyn Store, uid: &str, needed: i64) -> CoreResult<()> {
    if needed <= 0 {
        return Ok(());
    }
    let usage = store.get_storage_usage(uid).await?;
    ensure_available(needed, usage.available())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use refly_core::error::CoreError;
    use refly_db::MemoryStore;

    #[tokio::test]
    async fn rejects_when_short() {
        let store = MemoryStore::default();
        store.set_usage("u-1", 8, 10);
        check_storage_quota(&store, "u-1", 2).await.unwrap();
        assert_matches!(
            check_storage_quota(&store, "u-1", 3).await,
            Err(CoreError::StorageQuotaExceeded { needed: 3, available: 2 })
        );
    }

    #[tokio::test]
    async fn zero_needed_skips_lookup() {
        let store = MemoryStore::default();
        store.fail_on("get_storage_usage");
        check_storage_quota(&store, "u-1", 0).await.unwrap();
    }
}
