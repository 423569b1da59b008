//! Registration input and registry configuration.

use crate::domain::fingerprint::RequestFingerprint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{ProviderError, RequestId};
use std::time::Duration;

/// What a waiting caller eventually receives.
pub type Settlement = Result<Value, ProviderError>;

/// A request about to be registered.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub(crate) id: RequestId,
    pub(crate) method: String,
    pub(crate) params: Vec<Value>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) expiry_error: Option<ProviderError>,
    pub(crate) fingerprint: Option<RequestFingerprint>,
}

impl PendingRequest {
    pub fn new(id: RequestId, method: impl Into<String>) -> Self {
        Self {
            id,
            method: method.into(),
            params: Vec::new(),
            timeout: None,
            expiry_error: None,
            fingerprint: None,
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    /// Override the registry's default timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Error delivered when the timeout fires. Defaults to a timeout error.
    pub fn with_expiry_error(mut self, error: ProviderError) -> Self {
        self.expiry_error = Some(error);
        self
    }

    /// Index this entry so identical requests can coalesce onto it.
    pub fn with_fingerprint(mut self, fingerprint: RequestFingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Timeout applied when a request does not carry its own.
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,
    /// How often the background sweep looks for abandoned entries.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(10),
        }
    }
}
