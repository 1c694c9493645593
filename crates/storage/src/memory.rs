//! In-memory [`ObjectStorage`] with a switch that makes every call fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{ObjectStat, ObjectStorage, StorageError, StorageResult};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    failing: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects().contains_key(key)
    }

    /// Sorted list of stored keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("memory storage set to fail".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        self.check()?;
        self.objects()
            .get(key)
            .map(|o| o.body.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        self.check()?;
        self.objects().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn duplicate_file(&self, source: &str, target: &str) -> StorageResult<()> {
        self.check()?;
        let mut objects = self.objects();
        let object = objects
            .get(source)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(source.to_string()))?;
        objects.insert(target.to_string(), object);
        Ok(())
    }

    async fn stat_object(&self, key: &str) -> StorageResult<Option<ObjectStat>> {
        self.check()?;
        Ok(self.objects().get(key).map(|o| ObjectStat {
            size: o.body.len() as i64,
            content_type: Some(o.content_type.clone()),
        }))
    }

    async fn remove_objects(&self, keys: &[String]) -> StorageResult<()> {
        self.check()?;
        let mut objects = self.objects();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn duplicate_copies_body_and_type() {
        let storage = MemoryStorage::new();
        storage
            .put_object("a", Bytes::from_static(b"hello"), "text/plain")
            .await
            .unwrap();
        storage.duplicate_file("a", "b").await.unwrap();

        assert_eq!(storage.get_object("b").await.unwrap(), Bytes::from_static(b"hello"));
        let stat = storage.stat_object("b").await.unwrap().unwrap();
        assert_eq!(stat.size, 5);
        assert_eq!(stat.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn duplicate_of_missing_source_is_not_found() {
        let storage = MemoryStorage::new();
        assert_matches!(
            storage.duplicate_file("nope", "b").await,
            Err(StorageError::NotFound(key)) if key == "nope"
        );
    }

    #[tokio::test]
    async fn failing_switch_rejects_everything() {
        let storage = MemoryStorage::new();
        storage.set_failing(true);
        assert_matches!(
            storage.put_object("a", Bytes::new(), "text/plain").await,
            Err(StorageError::Backend(_))
        );
        storage.set_failing(false);
        storage.put_object("a", Bytes::new(), "text/plain").await.unwrap();
        storage.remove_objects(&["a".into(), "missing".into()]).await.unwrap();
        assert!(storage.keys().is_empty());
    }
}
