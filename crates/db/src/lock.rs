//! Non-blocking named locks.
//!
//! [`PgAdvisoryLock`] takes a transaction-scoped advisory lock, so a guard
//! that is dropped without `release` rolls back and frees the lock.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use refly_core::error::CoreResult;
use refly_core::store::{LockGuard, LockProvider};
use sqlx::{Postgres, Transaction};

use crate::error::db_error;
use crate::DbPool;

#[derive(Clone)]
pub struct PgAdvisoryLock {
    pool: DbPool,
}

impl PgAdvisoryLock {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

struct PgLockGuard {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LockGuard for PgLockGuard {
    async fn release(self: Box<Self>) -> CoreResult<()> {
        self.tx.commit().await.map_err(db_error)
    }
}

#[async_trait]
impl LockProvider for PgAdvisoryLock {
    async fn try_lock(&self, key: &str) -> CoreResult<Option<Box<dyn LockGuard>>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock(hashtext($1))")
            .bind(key)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
        if !acquired {
            tracing::debug!(key, "Advisory lock busy");
            return Ok(None);
        }
        Ok(Some(Box::new(PgLockGuard { tx })))
    }
}

/// In-process lock set for a single node.
#[derive(Clone, Default)]
pub struct LocalLock {
    held: Arc<Mutex<HashSet<String>>>,
}

struct LocalLockGuard {
    key: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl Drop for LocalLockGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.key);
    }
}

#[async_trait]
impl LockGuard for LocalLockGuard {
    async fn release(self: Box<Self>) -> CoreResult<()> {
        drop(self);
        Ok(())
    }
}

#[async_trait]
impl LockProvider for LocalLock {
    async fn try_lock(&self, key: &str) -> CoreResult<Option<Box<dyn LockGuard>>> {
        let inserted = self
            .held
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string());
        if !inserted {
            tracing::debug!(key, "Local lock busy");
            return Ok(None);
        }
        Ok(Some(Box::new(LocalLockGuard {
            key: key.to_string(),
            held: Arc::clone(&self.held),
        })))
    }
}
