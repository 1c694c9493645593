use refly_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from `toolsets`. `key` identifies the toolset definition and is
/// what imports deduplicate on.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Toolset {
    pub toolset_id: String,
    pub uid: String,
    pub key: String,
    pub name: String,
    pub auth_type: Option<String>,
    pub config: serde_json::Value,
    pub created_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}
