//! Serving one page relay.

use crate::dispatcher::BackgroundDispatcher;
use bridge_telemetry::metrics;
use shared_bus::{ConnectionMetadata, EventBroadcaster, RelayPort};
use shared_types::RelayMessage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Serve a page relay until its inbound stream ends.
///
/// The relay is attached to the broadcaster under the page's origin for the
/// duration. Requests run
/// concurrently and are answered on this relay only; pings are answered with
/// a pong. Approval decisions never come from a page and are dropped.
pub async fn serve_connection(
    dispatcher: Arc<BackgroundDispatcher>,
    broadcaster: Arc<EventBroadcaster>,
    port: Arc<dyn RelayPort>,
    mut inbound: mpsc::Receiver<RelayMessage>,
    meta: ConnectionMetadata,
) {
    let connection_id = port.connection_id();
    broadcaster.attach(Arc::clone(&port), meta.origin());
    metrics::RELAYS_ATTACHED.set(broadcaster.attached_count() as f64);
    info!(
        connection_id = %connection_id,
        sender = meta.sender_url.as_deref().unwrap_or("<unknown>"),
        "Relay connected"
    );

    while let Some(message) = inbound.recv().await {
        match message {
            RelayMessage::Request(request) => {
                let dispatcher = Arc::clone(&dispatcher);
                let port = Arc::clone(&port);
                let meta = meta.clone();
                tokio::spawn(async move {
                    let Some(response) = dispatcher.dispatch(&meta, request).await else {
                        return;
                    };
                    let id = response.id.clone();
                    if let Err(error) = port.send(RelayMessage::Response(response)).await {
                        warn!(request_id = %id, %error, "Response undeliverable");
                    }
                });
            }
            RelayMessage::Ping(probe) => {
                if let Err(error) = port.send(RelayMessage::Pong(probe)).await {
                    debug!(connection_id = %connection_id, %error, "Pong undeliverable");
                }
            }
            RelayMessage::Decision(decision) => {
                warn!(
                    connection_id = %connection_id,
                    request_id = %decision.request_id,
                    "Approval decision from a page relay dropped"
                );
            }
            other => debug!(kind = other.kind(), "Ignoring message not meant for the background"),
        }
    }

    broadcaster.detach(connection_id);
    metrics::RELAYS_ATTACHED.set(broadcaster.attached_count() as f64);
    info!(connection_id = %connection_id, "Relay disconnected");
}
