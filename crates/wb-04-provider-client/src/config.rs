//! Provider client configuration.

use crate::announce::ProviderInfo;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use wb_03_connection_monitor::MonitorConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// How long a relayed request may stay pending.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How long a request that needs user approval may stay pending. Must
    /// outlast the background's approval timeout so the page receives the
    /// user-rejected settlement rather than timing out first.
    #[serde(with = "humantime_serde")]
    pub approval_wait: Duration,
    /// Extra sends attempted when the relay reports a transient failure.
    pub send_retries: u32,
    /// Response ids remembered for duplicate suppression.
    pub processed_capacity: usize,
    /// Readiness probes before the client gives up and runs disconnected.
    pub connect_attempts: u32,
    /// Delay unit between readiness probes; attempt `n` waits `n` units.
    #[serde(with = "humantime_serde")]
    pub connect_retry_delay: Duration,
    /// How often abandoned pending entries are collected.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    pub info: ProviderInfo,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            approval_wait: Duration::from_secs(65),
            send_retries: 2,
            processed_capacity: 100,
            connect_attempts: 3,
            connect_retry_delay: Duration::from_secs(1),
            sweep_interval: Duration::from_secs(10),
            info: ProviderInfo::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("approval_wait ({approval_wait:?}) must not be below request_timeout ({request_timeout:?})")]
    ApprovalWaitTooShort {
        approval_wait: Duration,
        request_timeout: Duration,
    },
    #[error("monitor: {0}")]
    Monitor(#[from] MonitorConfigError),
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ProviderConfigError> {
        if self.request_timeout.is_zero() {
            return Err(ProviderConfigError::Zero("request_timeout"));
        }
        if self.approval_wait < self.request_timeout {
            return Err(ProviderConfigError::ApprovalWaitTooShort {
                approval_wait: self.approval_wait,
                request_timeout: self.request_timeout,
            });
        }
        if self.processed_capacity == 0 {
            return Err(ProviderConfigError::Zero("processed_capacity"));
        }
        if self.connect_attempts == 0 {
            return Err(ProviderConfigError::Zero("connect_attempts"));
        }
        if self.sweep_interval.is_zero() {
            return Err(ProviderConfigError::Zero("sweep_interval"));
        }
        Ok(())
    }
}
