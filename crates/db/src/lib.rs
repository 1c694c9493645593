//! Persistence for Refly canvases, entities and shares.

pub mod error;
pub mod lock;
pub mod memory;
pub mod models;
pub mod pg_store;
pub mod repositories;
pub mod search;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub use memory::MemoryStore;
pub use pg_store::PgStore;
pub use store::Store;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
