//! Caller origins.
//!
//! An [`Origin`] is the `scheme://host[:port]` serialization of the page that
//! owns a relay connection. It is derived from the sender URL the transport
//! reports, so a page cannot claim another site's identity in its payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    #[error("sender url could not be parsed: {0}")]
    Unparseable(String),

    /// `file:`, `data:` and similar URLs have no tuple origin.
    #[error("sender url has an opaque origin: {0}")]
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    /// Derive the origin of a sender URL as reported by the transport.
    pub fn from_sender_url(sender_url: &str) -> Result<Self, OriginError> {
        let url =
            Url::parse(sender_url).map_err(|_| OriginError::Unparseable(sender_url.to_string()))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(OriginError::Opaque(sender_url.to_string()));
        }
        Ok(Self(origin.ascii_serialization()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host part, used in approval summaries.
    pub fn host(&self) -> &str {
        self.0
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
