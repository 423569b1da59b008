use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Request ids remembered for duplicate suppression.
    pub seen_capacity: usize,
    /// Upper bound on a chain-data collaborator call.
    #[serde(with = "humantime_serde")]
    pub chain_data_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            seen_capacity: 1024,
            chain_data_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatcherConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<(), DispatcherConfigError> {
        if self.seen_capacity == 0 {
            return Err(DispatcherConfigError::Zero("seen_capacity"));
        }
        if self.chain_data_timeout.is_zero() {
            return Err(DispatcherConfigError::Zero("chain_data_timeout"));
        }
        Ok(())
    }
}
