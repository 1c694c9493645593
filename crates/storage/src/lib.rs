//! Object storage for canvas states, entity content and share blobs.

pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use refly_core::error::CoreError;

pub use memory::MemoryStorage;
pub use s3::S3Storage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => CoreError::not_found("Object", key),
            StorageError::Backend(msg) => CoreError::Storage(msg),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Size and type of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    pub size: i64,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn get_object(&self, key: &str) -> StorageResult<Bytes>;

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()>;

    /// Server-side copy of `source` to `target`. Fails with `NotFound` when
    /// the source is missing.
    async fn duplicate_file(&self, source: &str, target: &str) -> StorageResult<()>;

    async fn stat_object(&self, key: &str) -> StorageResult<Option<ObjectStat>>;

    /// Remove every key. Missing keys are ignored.
    async fn remove_objects(&self, keys: &[String]) -> StorageResult<()>;
}
