//! Repository for the `share_records` table.

use sqlx::PgPool;

use crate::models::share_record::{ShareRecord, UpdateShareRecord};

const COLUMNS: &str = "share_id, uid, entity_id, entity_type, title, storage_key, \
     parent_share_id, allow_duplication, created_at, updated_at, deleted_at";

pub struct ShareRecordRepo;

impl ShareRecordRepo {
    pub async fn create(pool: &PgPool, record: &ShareRecord) -> Result<ShareRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO share_records (share_id, uid, entity_id, entity_type, title, \
                storage_key, parent_share_id, allow_duplication, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ShareRecord>(&query)
            .bind(&record.share_id)
            .bind(&record.uid)
            .bind(&record.entity_id)
            .bind(&record.entity_type)
            .bind(&record.title)
            .bind(&record.storage_key)
            .bind(&record.parent_share_id)
            .bind(record.allow_duplication)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(pool)
            .await
    }

    /// Find the live share keyed by `(uid, entity_id, entity_type, parent_share_id)`.
    pub async fn find_active(
        pool: &PgPool,
        uid: &str,
        entity_id: &str,
        entity_type: &str,
        parent_share_id: Option<&str>,
    ) -> Result<Option<ShareRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM share_records
             WHERE uid = $1 AND entity_id = $2 AND entity_type = $3
               AND parent_share_id IS NOT DISTINCT FROM $4
               AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, ShareRecord>(&query)
            .bind(uid)
            .bind(entity_id)
            .bind(entity_type)
            .bind(parent_share_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a live share by its public ID.
    pub async fn find_by_share_id(
        pool: &PgPool,
        share_id: &str,
    ) -> Result<Option<ShareRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM share_records WHERE share_id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, ShareRecord>(&query)
            .bind(share_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        share_id: &str,
        input: &UpdateShareRecord,
    ) -> Result<Option<ShareRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE share_records SET title = $2, storage_key = $3, allow_duplication = $4, \
                updated_at = NOW()
             WHERE share_id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ShareRecord>(&query)
            .bind(share_id)
            .bind(&input.title)
            .bind(&input.storage_key)
            .bind(input.allow_duplication)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_children(
        pool: &PgPool,
        parent_share_id: &str,
    ) -> Result<Vec<ShareRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM share_records
             WHERE parent_share_id = $1 AND deleted_at IS NULL ORDER BY created_at, share_id"
        );
        sqlx::query_as::<_, ShareRecord>(&query)
            .bind(parent_share_id)
            .fetch_all(pool)
            .await
    }

    /// Soft-delete a set of shares. Returns the number of rows marked deleted.
    pub async fn soft_delete_many(pool: &PgPool, share_ids: &[String]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE share_records SET deleted_at = NOW()
             WHERE share_id = ANY($1) AND deleted_at IS NULL",
        )
        .bind(share_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
