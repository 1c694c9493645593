//! Repository for the `code_artifacts` table.

use sqlx::PgPool;

use crate::models::code_artifact::CodeArtifact;

const COLUMNS: &str = "artifact_id, uid, title, language, artifact_type, canvas_id, storage_key, \
     created_at, updated_at, deleted_at";

pub struct CodeArtifactRepo;

impl CodeArtifactRepo {
    pub async fn create(pool: &PgPool, artifact: &CodeArtifact) -> Result<CodeArtifact, sqlx::Error> {
        let query = format!(
            "INSERT INTO code_artifacts (artifact_id, uid, title, language, artifact_type, \
                canvas_id, storage_key, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CodeArtifact>(&query)
            .bind(&artifact.artifact_id)
            .bind(&artifact.uid)
            .bind(&artifact.title)
            .bind(&artifact.language)
            .bind(&artifact.artifact_type)
            .bind(&artifact.canvas_id)
            .bind(&artifact.storage_key)
            .bind(artifact.created_at)
            .bind(artifact.updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        artifact_id: &str,
    ) -> Result<Option<CodeArtifact>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM code_artifacts WHERE artifact_id = $1");
        sqlx::query_as::<_, CodeArtifact>(&query)
            .bind(artifact_id)
            .fetch_optional(pool)
            .await
    }
}
