//! Trait seams for the search index and the distributed lock.
//!
//! Implementations live in `refly-db` (Postgres and in-memory).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// A full-text indexed entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    pub id: String,
    pub uid: String,
    pub entity_type: String,
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn upsert_document(&self, doc: SearchDocument) -> CoreResult<()>;

    /// Copy the indexed entry of `source_id` to `target_id`, owned by `uid`.
    /// A missing source is not an error.
    async fn duplicate_document(&self, source_id: &str, target_id: &str, uid: &str)
        -> CoreResult<()>;

    async fn delete_document(&self, id: &str) -> CoreResult<()>;
}

/// A held lock. Dropping the guard releases it as well; `release` reports
/// errors from an explicit release.
#[async_trait]
pub trait LockGuard: Send {
    async fn release(self: Box<Self>) -> CoreResult<()>;
}

#[async_trait]
pub trait LockProvider: Send + Sync {
    /// Try to take `key` without waiting. `None` means someone else holds it.
    async fn try_lock(&self, key: &str) -> CoreResult<Option<Box<dyn LockGuard>>>;
}

/// Lock key guarding the canvas → entity relation sync.
pub fn canvas_relation_lock_key(canvas_id: &str) -> String {
    format!("canvas-entity-relation:{canvas_id}")
}
