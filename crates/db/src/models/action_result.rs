//! Skill response rows: action results, their tool calls and messages.

use refly_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from `action_results`. `(result_id, version)` is the primary key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub result_id: String,
    pub version: i32,
    pub uid: String,
    pub title: String,
    /// Canvas the result belongs to.
    pub target_id: Option<String>,
    pub status: String,
    pub input: serde_json::Value,
    pub context: serde_json::Value,
    pub tool_sets: serde_json::Value,
    pub actual_tools: serde_json::Value,
    pub history: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// A row from `tool_call_results`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub call_id: String,
    pub result_id: String,
    pub version: i32,
    pub toolset_id: String,
    pub tool_name: String,
    pub step_name: Option<String>,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
    pub status: String,
    pub created_at: Timestamp,
}

/// A row from `action_messages`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActionMessage {
    pub message_id: String,
    pub result_id: String,
    pub version: i32,
    pub kind: String,
    pub content: String,
    pub tool_call_id: Option<String>,
    pub created_at: Timestamp,
}
