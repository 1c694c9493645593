//! Repository for the `toolsets` table.

use sqlx::PgPool;

use crate::models::toolset::Toolset;

const COLUMNS: &str = "toolset_id, uid, key, name, auth_type, config, created_at, deleted_at";

pub struct ToolsetRepo;

impl ToolsetRepo {
    pub async fn create(pool: &PgPool, toolset: &Toolset) -> Result<Toolset, sqlx::Error> {
        let query = format!(
            "INSERT INTO toolsets (toolset_id, uid, key, name, auth_type, config, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Toolset>(&query)
            .bind(&toolset.toolset_id)
            .bind(&toolset.uid)
            .bind(&toolset.key)
            .bind(&toolset.name)
            .bind(&toolset.auth_type)
            .bind(&toolset.config)
            .bind(toolset.created_at)
            .fetch_one(pool)
            .await
    }

    pub async fn list_by_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<Toolset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM toolsets
             WHERE toolset_id = ANY($1) AND deleted_at IS NULL ORDER BY toolset_id"
        );
        sqlx::query_as::<_, Toolset>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// List a user's live toolsets, oldest first.
    pub async fn list_by_user(pool: &PgPool, uid: &str) -> Result<Vec<Toolset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM toolsets
             WHERE uid = $1 AND deleted_at IS NULL ORDER BY created_at, toolset_id"
        );
        sqlx::query_as::<_, Toolset>(&query)
            .bind(uid)
            .fetch_all(pool)
            .await
    }
}
