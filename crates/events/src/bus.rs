//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub const CANVAS_DUPLICATED: &str = "canvas.duplicated";
pub const CANVAS_IMPORTED: &str = "canvas.imported";
pub const SHARE_CREATED: &str = "share.created";
pub const SHARE_DELETED: &str = "share.deleted";
pub const SHARE_DUPLICATED: &str = "share.duplicated";

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// Something that happened to a canvas or share.
///
/// Built with [`DomainEvent::new`] and the `with_*` builder methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    /// Dot-separated event name, e.g. `"canvas.duplicated"`.
    pub event_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub actor_uid: Option<String>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            entity_type: None,
            entity_id: None,
            actor_uid: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_actor(mut self, uid: impl Into<String>) -> Self {
        self.actor_uid = Some(uid.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Slow receivers that fall more than the channel capacity behind observe
/// `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Without subscribers the
    /// event is dropped.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
