//! JSON blobs written to object storage for each kind of share.
//!
//! These are the public payloads behind `GET /v1/share/{shareId}`. Entity IDs
//! in canvas blobs are replaced by child share IDs before they are written.

use refly_core::canvas::{CanvasEdge, CanvasNode};
use refly_core::workflow::WorkflowVariable;
use refly_db::models::action_result::{ActionMessage, ActionResult, ToolCall};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDocument {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub content_preview: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedResource {
    pub title: String,
    pub resource_type: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_preview: Option<String>,
    #[serde(default)]
    pub meta: serde_json::Value,
    /// Share-scoped copy of the raw upload.
    #[serde(default)]
    pub raw_file_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedCodeArtifact {
    pub title: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub artifact_type: Option<String>,
    pub content: String,
}

/// The latest version of an action result with its tool calls and messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSkillResponse {
    pub result: ActionResult,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub messages: Vec<ActionMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDriveFile {
    /// `dfs-` ID standing in for the source file ID inside the blob.
    pub file_id: String,
    pub name: String,
    pub mime_type: String,
    pub size: i64,
    pub source: String,
    pub storage_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedCanvas {
    pub title: String,
    pub nodes: Vec<CanvasNode>,
    pub edges: Vec<CanvasEdge>,
    #[serde(default)]
    pub variables: Vec<WorkflowVariable>,
    #[serde(default)]
    pub files: Vec<SharedDriveFile>,
}

impl SharedCanvas {
    /// Object keys owned by this blob besides the blob itself.
    pub fn file_keys(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.storage_key.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedWorkflowApp {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub canvas: SharedCanvas,
}
