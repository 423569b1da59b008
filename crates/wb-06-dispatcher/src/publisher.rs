//! Broadcaster wrapper that records per-event metrics.

use async_trait::async_trait;
use bridge_telemetry::{metric_inc, metrics};
use shared_bus::{BroadcastReport, EventBroadcaster, EventPublisher};
use shared_types::{Origin, ProviderEvent};
use std::sync::Arc;

pub struct MeteredPublisher {
    inner: Arc<EventBroadcaster>,
}

impl MeteredPublisher {
    pub fn new(inner: Arc<EventBroadcaster>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl EventPublisher for MeteredPublisher {
    async fn publish(&self, event: ProviderEvent) -> BroadcastReport {
        metric_inc!(metrics::EVENTS_BROADCAST, &[event.name().as_str()]);
        self.inner.publish(event).await
    }

    async fn publish_to(&self, origin: &Origin, event: ProviderEvent) -> BroadcastReport {
        metric_inc!(metrics::EVENTS_BROADCAST, &[event.name().as_str()]);
        self.inner.publish_to(origin, event).await
    }

    fn events_published(&self) -> u64 {
        self.inner.events_published()
    }
}
