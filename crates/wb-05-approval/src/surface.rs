//! Seam to the human-facing approval context.

use crate::ticket::ApprovalTicket;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("approval surface unavailable: {0}")]
    Unavailable(String),
    #[error("approval surface closed")]
    Closed,
}

/// Makes a ticket visible to the user.
///
/// `open` returns once the prompt is showing. The decision itself arrives
/// later as a separate message and is fed to
/// [`ApprovalOrchestrator::decide`](crate::ApprovalOrchestrator::decide).
#[async_trait]
pub trait ApprovalSurface: Send + Sync {
    async fn open(&self, ticket: &ApprovalTicket) -> Result<(), SurfaceError>;
}
