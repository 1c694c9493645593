//! Repository for the `storage_usages` table.

use sqlx::PgPool;

use crate::models::storage_usage::StorageUsage;

pub struct StorageUsageRepo;

impl StorageUsageRepo {
    pub async fn find(pool: &PgPool, uid: &str) -> Result<Option<StorageUsage>, sqlx::Error> {
        sqlx::query_as::<_, StorageUsage>(
            "SELECT uid, object_count, object_quota FROM storage_usages WHERE uid = $1",
        )
        .bind(uid)
        .fetch_optional(pool)
        .await
    }

    /// Add `delta` to a user's object count, creating the row with
    /// `default_quota` when missing. The count never drops below zero.
    pub async fn increment(
        pool: &PgPool,
        uid: &str,
        delta: i64,
        default_quota: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO storage_usages (uid, object_count, object_quota)
             VALUES ($1, GREATEST($2, 0), $3)
             ON CONFLICT (uid) DO UPDATE
               SET object_count = GREATEST(storage_usages.object_count + $2, 0)",
        )
        .bind(uid)
        .bind(delta)
        .bind(default_quota)
        .execute(pool)
        .await?;
        Ok(())
    }
}
