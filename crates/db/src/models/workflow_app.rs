use refly_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A published workflow built from a canvas.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowApp {
    pub app_id: String,
    pub uid: String,
    pub canvas_id: String,
    pub title: String,
    pub description: Option<String>,
    pub share_id: Option<String>,
    pub template_share_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}
