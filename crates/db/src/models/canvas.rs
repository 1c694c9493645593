//! Canvas rows and canvas/entity relation rows.

use refly_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Placeholder state while a duplication or import is in flight.
pub const CANVAS_STATUS_CREATING: &str = "creating";
/// Fully populated canvas.
pub const CANVAS_STATUS_READY: &str = "ready";

/// A row from the `canvases` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Canvas {
    pub canvas_id: String,
    pub uid: String,
    pub title: String,
    pub status: String,
    pub version: String,
    pub state_storage_key: Option<String>,
    pub workflow: serde_json::Value,
    pub project_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Canvas {
    /// A `creating` placeholder row with an empty workflow.
    pub fn placeholder(
        canvas_id: impl Into<String>,
        uid: impl Into<String>,
        title: impl Into<String>,
        project_id: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            canvas_id: canvas_id.into(),
            uid: uid.into(),
            title: title.into(),
            status: CANVAS_STATUS_CREATING.to_string(),
            version: String::new(),
            state_storage_key: None,
            workflow: serde_json::json!({}),
            project_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields written when a canvas receives a new state version.
#[derive(Debug, Clone)]
pub struct CanvasStateUpdate {
    pub canvas_id: String,
    pub state_storage_key: String,
    pub version: String,
    pub workflow: serde_json::Value,
    pub status: String,
}

/// A row from `canvas_entity_relations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEntityRelation {
    pub canvas_id: String,
    pub entity_id: String,
    pub entity_type: String,
}
