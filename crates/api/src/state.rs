use std::sync::Arc;

use refly_services::ServiceContext;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the service context holds its backends behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Store, object storage, search, locks, events and job queue.
    pub services: ServiceContext,
    /// Postgres pool, absent when running on the in-memory store.
    pub pool: Option<refly_db::DbPool>,
    /// Server configuration (accessed by the auth extractor).
    pub config: Arc<ServerConfig>,
}
