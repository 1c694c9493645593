use refly_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DUPLICATE_STATUS_PENDING: &str = "pending";
pub const DUPLICATE_STATUS_FINISH: &str = "finish";
pub const DUPLICATE_STATUS_FAILED: &str = "failed";

/// Audit row for one duplicated entity (`source_id → target_id`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRecord {
    pub record_id: String,
    pub uid: String,
    pub source_id: String,
    pub target_id: String,
    pub entity_type: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DuplicateRecord {
    pub fn pending(
        uid: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            record_id: refly_core::ids::gen_duplicate_record_id(),
            uid: uid.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            entity_type: entity_type.into(),
            status: DUPLICATE_STATUS_PENDING.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
