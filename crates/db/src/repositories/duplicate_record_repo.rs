//! Repository for the `duplicate_records` audit table.

use sqlx::PgPool;

use crate::models::duplicate_record::DuplicateRecord;

const COLUMNS: &str =
    "record_id, uid, source_id, target_id, entity_type, status, created_at, updated_at";

pub struct DuplicateRecordRepo;

impl DuplicateRecordRepo {
    pub async fn create(
        pool: &PgPool,
        record: &DuplicateRecord,
    ) -> Result<DuplicateRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO duplicate_records (record_id, uid, source_id, target_id, entity_type, \
                status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DuplicateRecord>(&query)
            .bind(&record.record_id)
            .bind(&record.uid)
            .bind(&record.source_id)
            .bind(&record.target_id)
            .bind(&record.entity_type)
            .bind(&record.status)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn update_status(
        pool: &PgPool,
        record_id: &str,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE duplicate_records SET status = $2, updated_at = NOW() WHERE record_id = $1",
        )
        .bind(record_id)
        .bind(status)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
