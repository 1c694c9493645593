//! Subscriber that writes every [`DomainEvent`] to the tracing log.

use tokio::sync::broadcast;

use crate::bus::DomainEvent;

pub struct EventLogger;

impl EventLogger {
    /// Log events until the bus is dropped.
    pub async fn run(mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::info!(
                        event_type = %event.event_type,
                        entity_type = event.entity_type.as_deref().unwrap_or(""),
                        entity_id = event.entity_id.as_deref().unwrap_or(""),
                        actor = event.actor_uid.as_deref().unwrap_or(""),
                        payload = %event.payload,
                        "Domain event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
    }
}
