//! # Bridge Configuration
//!
//! One document for every context, loaded from the JSON file named by
//! `WB_CONFIG` (all sections optional) with environment overrides applied
//! on top.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `WB_REQUEST_TIMEOUT` | `provider.request_timeout` |
//! | `WB_APPROVAL_TIMEOUT` | `service.approval.timeout` |
//! | `WB_APPROVAL_WAIT` | `provider.approval_wait` |
//! | `WB_PROBE_INTERVAL` | `monitor.probe_interval` |
//! | `WB_MAX_RECONNECT_ATTEMPTS` | `monitor.max_reconnect_attempts` |
//! | `WB_PAGE_URL` | `page_url` |
//!
//! Durations use humantime syntax (`30s`, `1m 30s`).

use humantime_serde::re::humantime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use wb_03_connection_monitor::{MonitorConfig, MonitorConfigError};
use wb_04_provider_client::{ProviderConfig, ProviderConfigError};
use wb_06_dispatcher::{ServiceConfig, ServiceError};

pub const CONFIG_PATH_VAR: &str = "WB_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub provider: ProviderConfig,
    pub monitor: MonitorConfig,
    pub service: ServiceConfig,
    /// Sender URL reported for the page opened at startup.
    pub page_url: String,
    /// Buffered messages per relay direction.
    pub relay_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            monitor: MonitorConfig::default(),
            service: ServiceConfig::default(),
            page_url: "https://app.example".to_string(),
            relay_capacity: 64,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },
    #[error("provider: {0}")]
    Provider(#[from] ProviderConfigError),
    #[error("monitor: {0}")]
    Monitor(#[from] MonitorConfigError),
    #[error("service: {0}")]
    Service(#[from] ServiceError),
    #[error("relay_capacity must be greater than zero")]
    RelayCapacity,
    #[error("provider.approval_wait ({approval_wait:?}) must exceed service.approval.timeout ({approval_timeout:?})")]
    ApprovalWait {
        approval_wait: Duration,
        approval_timeout: Duration,
    },
}

impl BridgeConfig {
    /// Defaults, then the `WB_CONFIG` file if set, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: shown.clone(),
            source,
        })?;
        let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: shown.clone(),
            source,
        })?;
        info!(path = %shown, "Loaded configuration file");
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("WB_REQUEST_TIMEOUT") {
            self.provider.request_timeout = parse_duration("WB_REQUEST_TIMEOUT", value)?;
        }
        if let Some(value) = lookup("WB_APPROVAL_TIMEOUT") {
            self.service.approval.timeout = parse_duration("WB_APPROVAL_TIMEOUT", value)?;
        }
        if let Some(value) = lookup("WB_APPROVAL_WAIT") {
            self.provider.approval_wait = parse_duration("WB_APPROVAL_WAIT", value)?;
        }
        if let Some(value) = lookup("WB_PROBE_INTERVAL") {
            self.monitor.probe_interval = parse_duration("WB_PROBE_INTERVAL", value)?;
        }
        if let Some(value) = lookup("WB_MAX_RECONNECT_ATTEMPTS") {
            self.monitor.max_reconnect_attempts = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env {
                    var: "WB_MAX_RECONNECT_ATTEMPTS",
                    value,
                })?;
        }
        if let Some(value) = lookup("WB_PAGE_URL") {
            self.page_url = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        self.monitor.validate()?;
        self.service.validate()?;
        if self.relay_capacity == 0 {
            return Err(ConfigError::RelayCapacity);
        }
        // The page must still be waiting when the background settles an
        // undecided prompt as a rejection.
        if self.provider.approval_wait <= self.service.approval.timeout {
            return Err(ConfigError::ApprovalWait {
                approval_wait: self.provider.approval_wait,
                approval_timeout: self.service.approval.timeout,
            });
        }
        Ok(())
    }
}

fn parse_duration(var: &'static str, value: String) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|_| ConfigError::Env { var, value })
}
