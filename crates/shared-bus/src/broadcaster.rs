//! # Event Broadcaster
//!
//! Pushes unsolicited provider events to attached relays.
//!
//! Each relay is attached with the origin of its page. Chain and connection
//! events go to every relay; `accountsChanged` only ever goes to the relays
//! of one origin, since accounts are granted per origin.
//!
//! Delivery is best-effort: closed relays are skipped and detached, a relay
//! that errors or stalls past the send timeout is counted as failed, and
//! none of that affects the other relays or the caller.

use crate::transport::{ConnectionId, RelayPort, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use shared_types::{Origin, ProviderEvent, RelayEvent, RelayMessage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-relay send timeout.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub skipped_closed: usize,
    pub failed: usize,
}

/// Publishing side used by components that emit provider events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Deliver to every relay. Account events are refused here.
    async fn publish(&self, event: ProviderEvent) -> BroadcastReport;

    /// Deliver only to relays whose page has `origin`.
    async fn publish_to(&self, origin: &Origin, event: ProviderEvent) -> BroadcastReport;

    /// Total events published since construction.
    fn events_published(&self) -> u64;
}

struct Attached {
    port: Arc<dyn RelayPort>,
    origin: Option<Origin>,
}

pub struct EventBroadcaster {
    relays: DashMap<ConnectionId, Attached>,
    send_timeout: Duration,
    events_published: AtomicU64,
}

impl EventBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::with_send_timeout(DEFAULT_SEND_TIMEOUT)
    }

    #[must_use]
    pub fn with_send_timeout(send_timeout: Duration) -> Self {
        Self {
            relays: DashMap::new(),
            send_timeout,
            events_published: AtomicU64::new(0),
        }
    }

    /// Attach a relay. `origin` is `None` when the page's origin could not
    /// be resolved; such relays never receive origin-scoped events.
    pub fn attach(&self, relay: Arc<dyn RelayPort>, origin: Option<Origin>) {
        let id = relay.connection_id();
        debug!(
            connection_id = %id,
            origin = origin.as_ref().map_or("unknown", Origin::as_str),
            "Relay attached"
        );
        self.relays.insert(id, Attached { port: relay, origin });
    }

    pub fn detach(&self, id: ConnectionId) -> bool {
        let removed = self.relays.remove(&id).is_some();
        if removed {
            debug!(connection_id = %id, "Relay detached");
        }
        removed
    }

    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.relays.len()
    }

    pub fn is_attached(&self, id: ConnectionId) -> bool {
        self.relays.contains_key(&id)
    }

    async fn deliver(
        &self,
        relay: Arc<dyn RelayPort>,
        message: RelayMessage,
    ) -> Result<(), TransportError> {
        match tokio::time::timeout(self.send_timeout, relay.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// Send one event to every attached relay.
    pub async fn broadcast(&self, event: &ProviderEvent) -> BroadcastReport {
        // Snapshot so no map guard is held across an await.
        let relays: Vec<Arc<dyn RelayPort>> = self
            .relays
            .iter()
            .map(|entry| Arc::clone(&entry.value().port))
            .collect();
        self.send_all(relays, event).await
    }

    /// Send one event to the relays attached with `origin`.
    pub async fn broadcast_to(&self, origin: &Origin, event: &ProviderEvent) -> BroadcastReport {
        let relays: Vec<Arc<dyn RelayPort>> = self
            .relays
            .iter()
            .filter(|entry| entry.value().origin.as_ref() == Some(origin))
            .map(|entry| Arc::clone(&entry.value().port))
            .collect();
        self.send_all(relays, event).await
    }

    async fn send_all(
        &self,
        relays: Vec<Arc<dyn RelayPort>>,
        event: &ProviderEvent,
    ) -> BroadcastReport {
        let message = RelayMessage::Event(RelayEvent::from(event));
        let mut report = BroadcastReport::default();

        let mut live = Vec::with_capacity(relays.len());
        for relay in relays {
            if relay.is_closed() {
                report.skipped_closed += 1;
                self.detach(relay.connection_id());
            } else {
                live.push(relay);
            }
        }

        let sends = live.into_iter().map(|relay| {
            let message = message.clone();
            async move {
                let id = relay.connection_id();
                (id, self.deliver(relay, message).await)
            }
        });

        for (id, outcome) in join_all(sends).await {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(TransportError::Closed) => {
                    report.skipped_closed += 1;
                    self.detach(id);
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(connection_id = %id, event = %event.name(), error = %e, "Event delivery failed");
                }
            }
        }

        debug!(
            event = %event.name(),
            delivered = report.delivered,
            skipped = report.skipped_closed,
            failed = report.failed,
            "Event broadcast"
        );
        report
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for EventBroadcaster {
    async fn publish(&self, event: ProviderEvent) -> BroadcastReport {
        if matches!(event, ProviderEvent::AccountsChanged(_)) {
            warn!(event = %event.name(), "Account events need an origin, not broadcast");
            return BroadcastReport::default();
        }
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.broadcast(&event).await
    }

    async fn publish_to(&self, origin: &Origin, event: ProviderEvent) -> BroadcastReport {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.broadcast_to(origin, &event).await
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
