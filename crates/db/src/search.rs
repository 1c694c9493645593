//! Full-text search index implementations.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use refly_core::error::CoreResult;
use refly_core::store::{SearchDocument, SearchIndex};

use crate::error::db_error;
use crate::DbPool;

/// Postgres `tsvector` index over the `search_documents` table.
#[derive(Clone)]
pub struct PgSearchIndex {
    pool: DbPool,
}

impl PgSearchIndex {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearchIndex for PgSearchIndex {
    async fn upsert_document(&self, doc: SearchDocument) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO search_documents (id, uid, entity_type, title, content)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE
               SET uid = EXCLUDED.uid, entity_type = EXCLUDED.entity_type,
                   title = EXCLUDED.title, content = EXCLUDED.content, updated_at = NOW()",
        )
        .bind(&doc.id)
        .bind(&doc.uid)
        .bind(&doc.entity_type)
        .bind(&doc.title)
        .bind(&doc.content)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn duplicate_document(
        &self,
        source_id: &str,
        target_id: &str,
        uid: &str,
    ) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO search_documents (id, uid, entity_type, title, content)
             SELECT $2, $3, entity_type, title, content FROM search_documents WHERE id = $1
             ON CONFLICT (id) DO UPDATE
               SET uid = EXCLUDED.uid, title = EXCLUDED.title,
                   content = EXCLUDED.content, updated_at = NOW()",
        )
        .bind(source_id)
        .bind(target_id)
        .bind(uid)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM search_documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

/// Map-backed index for tests and local runs.
#[derive(Default)]
pub struct MemorySearchIndex {
    docs: Mutex<HashMap<String, SearchDocument>>,
}

impl MemorySearchIndex {
    pub fn get(&self, id: &str) -> Option<SearchDocument> {
        self.docs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn upsert_document(&self, doc: SearchDocument) -> CoreResult<()> {
        self.docs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn duplicate_document(
        &self,
        source_id: &str,
        target_id: &str,
        uid: &str,
    ) -> CoreResult<()> {
        let mut docs = self.docs.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(source) = docs.get(source_id).cloned() {
            docs.insert(
                target_id.to_string(),
                SearchDocument {
                    id: target_id.to_string(),
                    uid: uid.to_string(),
                    ..source
                },
            );
        }
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> CoreResult<()> {
        self.docs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_copies_content_under_new_owner() {
        let index = MemorySearchIndex::default();
        index
            .upsert_document(SearchDocument {
                id: "d-1".into(),
                uid: "u-1".into(),
                entity_type: "document".into(),
                title: "Notes".into(),
                content: "hello".into(),
            })
            .await
            .unwrap();

        index.duplicate_document("d-1", "d-2", "u-2").await.unwrap();
        index.duplicate_document("missing", "d-3", "u-2").await.unwrap();

        let copy = index.get("d-2").unwrap();
        assert_eq!(copy.uid, "u-2");
        assert_eq!(copy.content, "hello");
        assert!(index.get("d-3").is_none());
        assert_eq!(index.len(), 2);
    }
}
