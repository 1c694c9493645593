//! Refly domain events and background jobs.
//!
//! - [`EventBus`] is an in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`] is the event envelope published after canvas and share
//!   operations.
//! - [`EventLogger`] is a subscriber that writes every event to the log.
//! - [`JobQueue`] hands deferred work (storage cleanup, relation sync) to a
//!   worker loop.

pub mod bus;
pub mod logger;
pub mod queue;

pub use bus::{DomainEvent, EventBus};
pub use logger::EventLogger;
pub use queue::{run_worker, Job, JobHandler, JobQueue};
