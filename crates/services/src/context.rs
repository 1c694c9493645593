//! The dependency bundle every service function receives.

use std::sync::Arc;

use refly_core::store::{LockProvider, SearchIndex};
use refly_db::lock::LocalLock;
use refly_db::memory::MemoryStore;
use refly_db::search::MemorySearchIndex;
use refly_db::Store;
use refly_events::{DomainEvent, EventBus, JobQueue};
use refly_storage::{MemoryStorage, ObjectStorage};

use crate::config::ServiceConfig;

/// Built once at startup and cloned into handlers and workers.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn Store>,
    pub storage: Arc<dyn ObjectStorage>,
    pub search: Arc<dyn SearchIndex>,
    pub locks: Arc<dyn LockProvider>,
    pub events: Arc<EventBus>,
    /// When `None`, jobs run inline in the caller.
    pub jobs: Option<JobQueue>,
    pub config: ServiceConfig,
}

impl ServiceContext {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn ObjectStorage>,
        search: Arc<dyn SearchIndex>,
        locks: Arc<dyn LockProvider>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            storage,
            search,
            locks,
            events: Arc::new(EventBus::default()),
            jobs: None,
            config,
        }
    }

    /// Everything in process: memory store, storage, search and locks.
    pub fn in_memory(config: ServiceConfig) -> Self {
        Self::new(
            Arc::new(MemoryStore::new(config.default_object_quota)),
            Arc::new(MemoryStorage::new()),
            Arc::new(MemorySearchIndex::default()),
            Arc::new(LocalLock::default()),
            config,
        )
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_jobs(mut self, jobs: JobQueue) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub(crate) fn publish(&self, event: DomainEvent) {
        self.events.publish(event);
    }
}
