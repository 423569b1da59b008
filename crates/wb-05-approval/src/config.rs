use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// How long a ticket waits for a decision.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Identical requests arriving within this window share one ticket.
    #[serde(with = "humantime_serde")]
    pub coalesce_window: Duration,
    /// Outstanding tickets allowed at once.
    pub max_pending: usize,
    /// Active chain before any switch is approved.
    pub initial_chain_id: String,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            coalesce_window: Duration::from_secs(5),
            max_pending: 10,
            initial_chain_id: "0x1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("coalesce window ({window:?}) must not exceed the approval timeout ({timeout:?})")]
    WindowTooLong { window: Duration, timeout: Duration },
    #[error("initial chain id must be 0x-prefixed hex, got {0:?}")]
    InvalidChainId(String),
}

impl ApprovalConfig {
    pub fn validate(&self) -> Result<(), ApprovalConfigError> {
        if self.timeout.is_zero() {
            return Err(ApprovalConfigError::Zero("timeout"));
        }
        if self.max_pending == 0 {
            return Err(ApprovalConfigError::Zero("max_pending"));
        }
        if self.coalesce_window > self.timeout {
            return Err(ApprovalConfigError::WindowTooLong {
                window: self.coalesce_window,
                timeout: self.timeout,
            });
        }
        let hex = self.initial_chain_id.strip_prefix("0x").unwrap_or_default();
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ApprovalConfigError::InvalidChainId(
                self.initial_chain_id.clone(),
            ));
        }
        Ok(())
    }
}
