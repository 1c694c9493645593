use refly_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `resources` table.
///
/// `storage_key` holds the parsed text; `raw_file_key` the original upload.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub resource_id: String,
    pub uid: String,
    pub title: String,
    pub resource_type: String,
    pub canvas_id: Option<String>,
    pub project_id: Option<String>,
    pub storage_key: Option<String>,
    pub raw_file_key: Option<String>,
    pub content_preview: Option<String>,
    pub meta: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}
