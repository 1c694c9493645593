//! Orchestration of canvas duplication, import/export and sharing.
//!
//! Every operation takes a [`ServiceContext`] holding the store, object
//! storage, search index, lock provider, event bus and optional job queue.

pub mod canvas;
pub mod config;
pub mod context;
pub mod duplicate;
pub mod jobs;
pub mod limit;
pub mod quota;
pub mod share;

pub use config::ServiceConfig;
pub use context::ServiceContext;
