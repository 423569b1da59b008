//! Content address of a request, used to coalesce identical in-flight calls.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    /// Hash `method`, the canonical JSON of `params` and an optional scope
    /// (the caller origin on the backend).
    ///
    /// Object keys serialize sorted, so key order in `params` does not matter.
    pub fn compute(method: &str, params: &[Value], scope: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update([0u8]);
        // Serializing a Vec<Value> cannot fail.
        let canonical = serde_json::to_vec(params).unwrap_or_default();
        hasher.update(&canonical);
        hasher.update([0u8]);
        if let Some(scope) = scope {
            hasher.update(scope.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..16])
    }
}
