use refly_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `documents` table. Content lives in object storage.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub doc_id: String,
    pub uid: String,
    pub title: String,
    pub canvas_id: Option<String>,
    pub project_id: Option<String>,
    pub storage_key: String,
    pub content_preview: Option<String>,
    pub word_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}
