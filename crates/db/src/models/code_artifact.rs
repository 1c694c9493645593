use refly_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `code_artifacts` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CodeArtifact {
    pub artifact_id: String,
    pub uid: String,
    pub title: String,
    pub language: Option<String>,
    pub artifact_type: Option<String>,
    pub canvas_id: Option<String>,
    pub storage_key: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}
