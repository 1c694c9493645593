//! Repository for the `resources` table.

use sqlx::PgPool;

use crate::models::resource::Resource;

const COLUMNS: &str = "resource_id, uid, title, resource_type, canvas_id, project_id, storage_key, \
     raw_file_key, content_preview, meta, created_at, updated_at, deleted_at";

pub struct ResourceRepo;

impl ResourceRepo {
    pub async fn create(pool: &PgPool, resource: &Resource) -> Result<Resource, sqlx::Error> {
        let query = format!(
            "INSERT INTO resources (resource_id, uid, title, resource_type, canvas_id, project_id, \
                storage_key, raw_file_key, content_preview, meta, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Resource>(&query)
            .bind(&resource.resource_id)
            .bind(&resource.uid)
            .bind(&resource.title)
            .bind(&resource.resource_type)
            .bind(&resource.canvas_id)
            .bind(&resource.project_id)
            .bind(&resource.storage_key)
            .bind(&resource.raw_file_key)
            .bind(&resource.content_preview)
            .bind(&resource.meta)
            .bind(resource.created_at)
            .bind(resource.updated_at)
            .fetch_one(pool)
            .await
    }

    /// Find a resource by ID, including soft-deleted rows.
    pub async fn find_by_id(
        pool: &PgPool,
        resource_id: &str,
    ) -> Result<Option<Resource>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM resources WHERE resource_id = $1");
        sqlx::query_as::<_, Resource>(&query)
            .bind(resource_id)
            .fetch_optional(pool)
            .await
    }
}
