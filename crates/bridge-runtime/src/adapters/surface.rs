use async_trait::async_trait;
use tokio::sync::mpsc;
use wb_05_approval::{ApprovalSurface, ApprovalTicket, SurfaceError};

/// Hands prompts to whoever holds the receiving end (a UI bridge, a test).
pub struct ChannelApprovalSurface {
    prompts: mpsc::Sender<ApprovalTicket>,
}

impl ChannelApprovalSurface {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ApprovalTicket>) {
        let (prompts, rx) = mpsc::channel(capacity);
        (Self { prompts }, rx)
    }
}

#[async_trait]
impl ApprovalSurface for ChannelApprovalSurface {
    async fn open(&self, ticket: &ApprovalTicket) -> Result<(), SurfaceError> {
        self.prompts
            .try_send(ticket.clone())
            .map_err(|error| match error {
                mpsc::error::TrySendError::Full(_) => {
                    SurfaceError::Unavailable("prompt backlog full".to_string())
                }
                mpsc::error::TrySendError::Closed(_) => SurfaceError::Closed,
            })
    }
}
