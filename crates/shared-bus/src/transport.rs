//! Relay transport seam.

use async_trait::async_trait;
use shared_types::{Origin, RelayMessage};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one relay connection for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What the transport itself knows about the far end of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetadata {
    pub connection_id: ConnectionId,
    /// URL of the sending document as reported by the browser.
    pub sender_url: Option<String>,
}

impl ConnectionMetadata {
    pub fn new(connection_id: ConnectionId, sender_url: Option<String>) -> Self {
        Self {
            connection_id,
            sender_url,
        }
    }

    /// Caller origin. `None` when the transport reported nothing usable.
    pub fn origin(&self) -> Option<Origin> {
        self.sender_url
            .as_deref()
            .and_then(|url| Origin::from_sender_url(url).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("relay closed")]
    Closed,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("send timed out")]
    Timeout,
}

/// Outbound half of a relay connection.
#[async_trait]
pub trait RelayPort: Send + Sync {
    fn connection_id(&self) -> ConnectionId;

    async fn send(&self, message: RelayMessage) -> Result<(), TransportError>;

    /// Whether the far end has gone away.
    fn is_closed(&self) -> bool;
}

/// In-memory relay built on `tokio::sync::mpsc`.
pub mod channel {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    pub struct ChannelPort {
        id: ConnectionId,
        tx: mpsc::Sender<RelayMessage>,
    }

    impl ChannelPort {
        pub fn new(id: ConnectionId, tx: mpsc::Sender<RelayMessage>) -> Self {
            Self { id, tx }
        }
    }

    #[async_trait]
    impl RelayPort for ChannelPort {
        fn connection_id(&self) -> ConnectionId {
            self.id
        }

        async fn send(&self, message: RelayMessage) -> Result<(), TransportError> {
            self.tx
                .send(message)
                .await
                .map_err(|_| TransportError::Closed)
        }

        fn is_closed(&self) -> bool {
            self.tx.is_closed()
        }
    }

    /// One side of a duplex relay.
    pub struct RelayEnd {
        pub port: Arc<ChannelPort>,
        pub inbound: mpsc::Receiver<RelayMessage>,
    }

    /// Create a connected pair of relay ends sharing one connection id.
    pub fn relay_pair(buffer: usize) -> (RelayEnd, RelayEnd) {
        let id = ConnectionId::next();
        let (a_tx, a_rx) = mpsc::channel(buffer);
        let (b_tx, b_rx) = mpsc::channel(buffer);
        (
            RelayEnd {
                port: Arc::new(ChannelPort::new(id, a_tx)),
                inbound: b_rx,
            },
            RelayEnd {
                port: Arc::new(ChannelPort::new(id, b_tx)),
                inbound: a_rx,
            },
        )
    }
}
