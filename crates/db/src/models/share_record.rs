use refly_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from `share_records`.
///
/// `storage_key` points at the exported JSON blob. At most one non-deleted
/// row exists per `(uid, entity_id, entity_type, parent_share_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    pub share_id: String,
    pub uid: String,
    pub entity_id: String,
    pub entity_type: String,
    pub title: String,
    pub storage_key: String,
    pub parent_share_id: Option<String>,
    pub allow_duplication: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// In-place update applied when a share is re-created.
#[derive(Debug, Clone)]
pub struct UpdateShareRecord {
    pub title: String,
    pub storage_key: String,
    pub allow_duplication: bool,
}
