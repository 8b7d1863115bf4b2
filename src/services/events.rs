//! Outbound domain events.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::events::DomainEvent;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to publish event: {0}")]
    Bus(String),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError>;
}

/// Publishes JSON-encoded events to NATS under `<prefix>.<subject>`.
pub struct NatsPublisher {
    client: async_nats::Client,
    prefix: String,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client, prefix: impl Into<String>) -> Self {
        Self { client, prefix: prefix.into() }
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(event)?;
        let subject = format!("{}.{}", self.prefix, event.subject());
        self.client.publish(subject, payload.into()).await.map_err(|e| PublishError::Bus(e.to_string()))
    }
}

/// Used when no message bus is configured.
#[derive(Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        tracing::debug!(subject = event.subject(), ?event, "domain event");
        Ok(())
    }
}

/// Publishes from a detached task. Failures are logged and never reach the caller.
pub fn publish_detached(publisher: &Arc<dyn EventPublisher>, event: DomainEvent) {
    let publisher = Arc::clone(publisher);
    tokio::spawn(async move {
        if let Err(e) = publisher.publish(&event).await {
            tracing::warn!(subject = event.subject(), error = %e, "event publish failed");
        }
    });
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every event it is given.
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub events: Mutex<Vec<DomainEvent>>,
    }

    impl RecordingPublisher {
        pub fn subjects(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().iter().map(DomainEvent::subject).collect()
        }
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }
}
