//! Repositories for the `canvases` and `canvas_entity_relations` tables.

use sqlx::PgPool;

use crate::models::canvas::{Canvas, CanvasEntityRelation, CanvasStateUpdate};
use crate::models::duplicate_record::DUPLICATE_STATUS_FINISH;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "canvas_id, uid, title, status, version, state_storage_key, workflow, \
     project_id, created_at, updated_at, deleted_at";

/// Provides CRUD operations for canvases.
pub struct CanvasRepo;

impl CanvasRepo {
    /// Insert a canvas row, returning it.
    pub async fn create(pool: &PgPool, canvas: &Canvas) -> Result<Canvas, sqlx::Error> {
        let query = format!(
            "INSERT INTO canvases (canvas_id, uid, title, status, version, state_storage_key, \
                workflow, project_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Canvas>(&query)
            .bind(&canvas.canvas_id)
            .bind(&canvas.uid)
            .bind(&canvas.title)
            .bind(&canvas.status)
            .bind(&canvas.version)
            .bind(&canvas.state_storage_key)
            .bind(&canvas.workflow)
            .bind(&canvas.project_id)
            .bind(canvas.created_at)
            .bind(canvas.updated_at)
            .fetch_one(pool)
            .await
    }

    /// Find a canvas by ID. Excludes soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, canvas_id: &str) -> Result<Option<Canvas>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM canvases WHERE canvas_id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Canvas>(&query)
            .bind(canvas_id)
            .fetch_optional(pool)
            .await
    }

    /// Point a canvas at a new state blob. Returns `true` if a row was updated.
    pub async fn update_state(pool: &PgPool, input: &CanvasStateUpdate) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE canvases SET state_storage_key = $2, version = $3, workflow = $4, \
                status = $5, updated_at = NOW()
             WHERE canvas_id = $1 AND deleted_at IS NULL",
        )
        .bind(&input.canvas_id)
        .bind(&input.state_storage_key)
        .bind(&input.version)
        .bind(&input.workflow)
        .bind(&input.status)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write the final state of a duplicated canvas and mark its duplicate
    /// record finished in one transaction.
    pub async fn finalize_duplication(
        pool: &PgPool,
        input: &CanvasStateUpdate,
        record_id: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE canvases SET state_storage_key = $2, version = $3, workflow = $4, \
                status = $5, updated_at = NOW()
             WHERE canvas_id = $1 AND deleted_at IS NULL",
        )
        .bind(&input.canvas_id)
        .bind(&input.state_storage_key)
        .bind(&input.version)
        .bind(&input.workflow)
        .bind(&input.status)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        sqlx::query(
            "UPDATE duplicate_records SET status = $2, updated_at = NOW() WHERE record_id = $1",
        )
        .bind(record_id)
        .bind(DUPLICATE_STATUS_FINISH)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Permanently delete a canvas. Returns `true` if a row was removed.
    pub async fn hard_delete(pool: &PgPool, canvas_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM canvases WHERE canvas_id = $1")
            .bind(canvas_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Provides the derived canvas → entity index.
pub struct CanvasEntityRelationRepo;

impl CanvasEntityRelationRepo {
    /// Replace every relation of a canvas with `relations`.
    pub async fn replace(
        pool: &PgPool,
        canvas_id: &str,
        relations: &[CanvasEntityRelation],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM canvas_entity_relations WHERE canvas_id = $1")
            .bind(canvas_id)
            .execute(&mut *tx)
            .await?;

        for relation in relations {
            sqlx::query(
                "INSERT INTO canvas_entity_relations (canvas_id, entity_id, entity_type)
                 VALUES ($1, $2, $3)
                 ON CONFLICT DO NOTHING",
            )
            .bind(canvas_id)
            .bind(&relation.entity_id)
            .bind(&relation.entity_type)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_by_canvas(
        pool: &PgPool,
        canvas_id: &str,
    ) -> Result<Vec<CanvasEntityRelation>, sqlx::Error> {
        sqlx::query_as::<_, CanvasEntityRelation>(
            "SELECT canvas_id, entity_id, entity_type FROM canvas_entity_relations
             WHERE canvas_id = $1 ORDER BY entity_type, entity_id",
        )
        .bind(canvas_id)
        .fetch_all(pool)
        .await
    }
}
