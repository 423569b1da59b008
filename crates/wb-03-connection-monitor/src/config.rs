use crate::backoff::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    #[serde(with = "humantime_serde")]
    pub probe_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    pub max_reconnect_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub base_backoff: Duration,
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(3),
            max_reconnect_attempts: 5,
            base_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("probe_timeout ({timeout:?}) must be shorter than probe_interval ({interval:?})")]
    ProbeTimeoutTooLong { timeout: Duration, interval: Duration },
    #[error("max_backoff must not be below base_backoff")]
    BackoffInverted,
}

impl MonitorConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.base_backoff, self.max_backoff)
    }

    pub fn validate(&self) -> Result<(), MonitorConfigError> {
        if self.probe_interval.is_zero() {
            return Err(MonitorConfigError::Zero("probe_interval"));
        }
        if self.probe_timeout.is_zero() {
            return Err(MonitorConfigError::Zero("probe_timeout"));
        }
        if self.max_reconnect_attempts == 0 {
            return Err(MonitorConfigError::Zero("max_reconnect_attempts"));
        }
        if self.probe_timeout >= self.probe_interval {
            return Err(MonitorConfigError::ProbeTimeoutTooLong {
                timeout: self.probe_timeout,
                interval: self.probe_interval,
            });
        }
        if self.max_backoff < self.base_backoff {
            return Err(MonitorConfigError::BackoffInverted);
        }
        Ok(())
    }
}
