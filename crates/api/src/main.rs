use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use refly_core::store::{LockProvider, SearchIndex};
use refly_db::lock::{LocalLock, PgAdvisoryLock};
use refly_db::search::{MemorySearchIndex, PgSearchIndex};
use refly_db::{DbPool, MemoryStore, PgStore, Store};
use refly_events::queue::DEFAULT_QUEUE_CAPACITY;
use refly_events::{run_worker, EventBus, EventLogger, JobQueue};
use refly_services::jobs::ServiceJobHandler;
use refly_services::ServiceContext;
use refly_storage::{MemoryStorage, ObjectStorage, S3Storage};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refly_api::config::{BackendConfig, ServerConfig, StorageBackend, StoreBackend};
use refly_api::router::build_app_router;
use refly_api::state::AppState;

type Backends = (
    Arc<dyn Store>,
    Arc<dyn SearchIndex>,
    Arc<dyn LockProvider>,
    Option<DbPool>,
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let backend = BackendConfig::from_env()?;

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "refly_api=debug,refly_services=debug,refly_events=info,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if backend.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Store ---
    let (store, search, locks, pool) = connect_store(&backend).await?;

    // --- Object storage ---
    let storage: Arc<dyn ObjectStorage> = match &backend.storage {
        StorageBackend::S3 { bucket, endpoint } => {
            tracing::info!(bucket = %bucket, endpoint = ?endpoint, "Using S3 object storage");
            Arc::new(S3Storage::from_env(bucket.clone(), endpoint.as_deref()).await)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory object storage; objects are lost on restart");
            Arc::new(MemoryStorage::new())
        }
    };

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe()));

    // --- Job queue ---
    let (jobs, receiver) = JobQueue::new(DEFAULT_QUEUE_CAPACITY);
    let services = ServiceContext::new(store, storage, search, locks, backend.service.clone())
        .with_events(Arc::clone(&event_bus))
        .with_jobs(jobs);

    let worker_cancel = CancellationToken::new();
    let worker_handle = tokio::spawn(run_worker(
        receiver,
        Arc::new(ServiceJobHandler::new(services.clone())),
        worker_cancel.clone(),
    ));
    tracing::info!("Event logger and job worker started");

    // --- App state ---
    let state = AppState {
        services,
        pool,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address: {}", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let drain = Duration::from_secs(config.shutdown_timeout_secs);

    worker_cancel.cancel();
    let _ = tokio::time::timeout(drain, worker_handle).await;
    tracing::info!("Job worker stopped");

    // The logger exits once the last bus handle is gone.
    drop(event_bus);
    let _ = tokio::time::timeout(drain, logger_handle).await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

async fn connect_store(backend: &BackendConfig) -> anyhow::Result<Backends> {
    let quota = backend.service.default_object_quota;
    match &backend.store {
        StoreBackend::Postgres { database_url } => {
            let pool = refly_db::create_pool(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connection pool created");

            refly_db::health_check(&pool)
                .await
                .context("Database health check failed")?;
            refly_db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone(), quota));
            let search: Arc<dyn SearchIndex> = Arc::new(PgSearchIndex::new(pool.clone()));
            let locks: Arc<dyn LockProvider> = Arc::new(PgAdvisoryLock::new(pool.clone()));
            Ok((store, search, locks, Some(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new(quota));
            let search: Arc<dyn SearchIndex> = Arc::new(MemorySearchIndex::default());
            let locks: Arc<dyn LockProvider> = Arc::new(LocalLock::default());
            Ok((store, search, locks, None))
        }
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
