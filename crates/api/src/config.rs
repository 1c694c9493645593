use std::str::FromStr;

use refly_services::config::{
    DEFAULT_DRIVE_FILE_CONCURRENCY, DEFAULT_DUPLICATE_CONCURRENCY, DEFAULT_SHARE_CONCURRENCY,
};
use refly_services::ServiceConfig;

use crate::auth::jwt::JwtConfig;

/// A malformed or missing environment variable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be set")]
    Missing { name: &'static str },

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Read `name`, falling back to `default` when unset.
fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { name })
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to drain after the server stops.
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env_or("PORT", 3000u16)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30)?,
            jwt: JwtConfig::from_env()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    S3 {
        bucket: String,
        /// S3-compatible endpoint (MinIO); `None` uses AWS.
        endpoint: Option<String>,
    },
    Memory,
}

/// Which store and object storage to run against, plus service tunables.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub store: StoreBackend,
    pub storage: StorageBackend,
    pub service: ServiceConfig,
    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

impl BackendConfig {
    /// | Env Var                   | Default    |
    /// |---------------------------|------------|
    /// | `STORE_BACKEND`           | `postgres` |
    /// | `DATABASE_URL`            | required for `postgres` |
    /// | `STORAGE_BACKEND`         | `s3`       |
    /// | `S3_BUCKET`               | required for `s3` |
    /// | `S3_ENDPOINT`             | unset      |
    /// | `DUPLICATE_CONCURRENCY`   | `10`       |
    /// | `SHARE_CONCURRENCY`       | `5`        |
    /// | `DRIVE_FILE_CONCURRENCY`  | `3`        |
    /// | `DEFAULT_OBJECT_QUOTA`    | `1000`     |
    /// | `LOG_FORMAT`              | `text`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        let store = match std::env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("postgres") | Err(_) => StoreBackend::Postgres {
                database_url: required("DATABASE_URL")?,
            },
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let storage = match std::env::var("STORAGE_BACKEND").as_deref() {
            Ok("memory") => StorageBackend::Memory,
            Ok("s3") | Err(_) => StorageBackend::S3 {
                bucket: required("S3_BUCKET")?,
                endpoint: std::env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),
            },
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let defaults = ServiceConfig::default();
        let service = ServiceConfig {
            duplicate_concurrency: env_or("DUPLICATE_CONCURRENCY", DEFAULT_DUPLICATE_CONCURRENCY)?
                .max(1),
            share_concurrency: env_or("SHARE_CONCURRENCY", DEFAULT_SHARE_CONCURRENCY)?.max(1),
            drive_file_concurrency: env_or(
                "DRIVE_FILE_CONCURRENCY",
                DEFAULT_DRIVE_FILE_CONCURRENCY,
            )?
            .max(1),
            default_object_quota: env_or("DEFAULT_OBJECT_QUOTA", defaults.default_object_quota)?,
        };

        let log_json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

        Ok(Self {
            store,
            storage,
            service,
            log_json,
        })
    }
}
