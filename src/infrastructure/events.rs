//! Domain event sink: logs every event and forwards it to NATS when connected

use std::sync::{Arc, Mutex};
use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventSink {
    nats: Option<async_nats::Client>,
    recorded: Option<Arc<Mutex<Vec<DomainEvent>>>>,
}

impl EventSink {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats, recorded: None } }

    pub fn disabled() -> Self { Self::default() }

    /// Keeps emitted events in memory so callers can inspect them.
    pub fn recording() -> Self { Self { nats: None, recorded: Some(Arc::default()) } }

    pub fn recorded(&self) -> Vec<DomainEvent> {
        self.recorded.as_ref().and_then(|r| r.lock().ok().map(|events| events.clone())).unwrap_or_default()
    }

    /// Publishing is best effort. The write it describes is already committed.
    pub async fn emit(&self, event: DomainEvent) {
        tracing::debug!(subject = event.subject(), ?event, "Domain event");
        if let Some(recorded) = &self.recorded {
            if let Ok(mut events) = recorded.lock() { events.push(event.clone()); }
        }
        let Some(client) = &self.nats else { return };
        match serde_json::to_vec(&event) {
            Ok(payload) => {
                if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
                    tracing::warn!(subject = event.subject(), error = %e, "Failed to publish domain event");
                }
            }
            Err(e) => tracing::warn!(subject = event.subject(), error = %e, "Failed to encode domain event"),
        }
    }
}
