//! Repository for the `workflow_apps` table.

use sqlx::PgPool;

use crate::models::workflow_app::WorkflowApp;

const COLUMNS: &str = "app_id, uid, canvas_id, title, description, share_id, template_share_id, \
     created_at, updated_at, deleted_at";

pub struct WorkflowAppRepo;

impl WorkflowAppRepo {
    pub async fn create(pool: &PgPool, app: &WorkflowApp) -> Result<WorkflowApp, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_apps (app_id, uid, canvas_id, title, description, share_id, \
                template_share_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowApp>(&query)
            .bind(&app.app_id)
            .bind(&app.uid)
            .bind(&app.canvas_id)
            .bind(&app.title)
            .bind(&app.description)
            .bind(&app.share_id)
            .bind(&app.template_share_id)
            .bind(app.created_at)
            .bind(app.updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, app_id: &str) -> Result<Option<WorkflowApp>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM workflow_apps WHERE app_id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, WorkflowApp>(&query)
            .bind(app_id)
            .fetch_optional(pool)
            .await
    }

    /// Record the public and template share IDs of an app.
    pub async fn update_shares(
        pool: &PgPool,
        app_id: &str,
        share_id: &str,
        template_share_id: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workflow_apps SET share_id = $2, template_share_id = $3, updated_at = NOW()
             WHERE app_id = $1 AND deleted_at IS NULL",
        )
        .bind(app_id)
        .bind(share_id)
        .bind(template_share_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
