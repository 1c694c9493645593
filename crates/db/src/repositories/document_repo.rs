//! Repository for the `documents` table.

use sqlx::PgPool;

use crate::models::document::Document;

const COLUMNS: &str = "doc_id, uid, title, canvas_id, project_id, storage_key, content_preview, \
     word_count, created_at, updated_at, deleted_at";

pub struct DocumentRepo;

impl DocumentRepo {
    pub async fn create(pool: &PgPool, doc: &Document) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents (doc_id, uid, title, canvas_id, project_id, storage_key, \
                content_preview, word_count, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(&doc.doc_id)
            .bind(&doc.uid)
            .bind(&doc.title)
            .bind(&doc.canvas_id)
            .bind(&doc.project_id)
            .bind(&doc.storage_key)
            .bind(&doc.content_preview)
            .bind(doc.word_count)
            .bind(doc.created_at)
            .bind(doc.updated_at)
            .fetch_one(pool)
            .await
    }

    /// Find a document by ID, including soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, doc_id: &str) -> Result<Option<Document>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM documents WHERE doc_id = $1");
        sqlx::query_as::<_, Document>(&query)
            .bind(doc_id)
            .fetch_optional(pool)
            .await
    }
}
