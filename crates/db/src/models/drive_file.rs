use refly_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from `drive_files`: a user file attached to a canvas.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub file_id: String,
    pub uid: String,
    pub canvas_id: String,
    pub name: String,
    pub mime_type: String,
    pub storage_key: String,
    pub size: i64,
    pub source: String,
    pub created_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}
