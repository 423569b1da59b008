//! Seams to the component being monitored.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("probe timed out")]
    TimedOut,
    #[error("relay unreachable: {0}")]
    Unreachable(String),
}

/// Lightweight round trip over the relay.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self) -> Result<(), ProbeError>;
}

/// Receives connection transitions.
#[async_trait]
pub trait ConnectionObserver: Send + Sync {
    /// The relay stopped answering. Pending work should be failed.
    async fn connection_lost(&self);

    /// The relay answers again. Re-announce and resync cached state.
    async fn connection_restored(&self);
}
