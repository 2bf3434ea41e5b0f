//! Publication of committed domain events to NATS.

use crate::domain::events::DomainEvent;

pub const SUBJECT_PREFIX: &str = "nabaat.store";

/// Publishes events when a NATS client is configured; otherwise does nothing.
#[derive(Clone, Default)]
pub struct EventPublisher { nats: Option<async_nats::Client> }

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "connected to NATS");
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "NATS unavailable, events will not be published");
                Self::disabled()
            }
        }
    }

    pub fn subject(event: &DomainEvent) -> String { format!("{SUBJECT_PREFIX}.{}", event.subject()) }

    /// Failures are logged, not returned.
    pub async fn publish_all(&self, events: &[DomainEvent]) {
        let Some(client) = &self.nats else { return };
        for event in events {
            let payload = match serde_json::to_vec(event) {
                Ok(p) => p,
                Err(e) => { tracing::error!(error = %e, "failed to encode event"); continue; }
            };
            if let Err(e) = client.publish(Self::subject(event), payload.into()).await {
                tracing::warn!(subject = event.subject(), error = %e, "failed to publish event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_subjects_and_payload() {
        let event = DomainEvent::StockAdjusted { component_id: Uuid::nil(), delta: -2, stock: 5 };
        assert_eq!(EventPublisher::subject(&event), "nabaat.store.stock.adjusted");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stock_adjusted");
        assert_eq!(json["delta"], -2);
    }

    #[tokio::test]
    async fn test_disabled_publisher_is_noop() {
        EventPublisher::connect(None).await.publish_all(&[DomainEvent::StockAdjusted { component_id: Uuid::nil(), delta: 1, stock: 1 }]).await;
    }
}
