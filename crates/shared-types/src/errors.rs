//! Provider error taxonomy.
//!
//! Every failure that crosses the relay is normalized into a [`ProviderError`]
//! carrying one of the fixed codes below (EIP-1193 provider errors plus the
//! two JSON-RPC codes the bridge can produce itself).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Numeric error codes.
pub mod codes {
    // EIP-1193 provider errors
    pub const USER_REJECTED: i32 = 4001;
    pub const UNAUTHORIZED: i32 = 4100;
    pub const UNSUPPORTED_METHOD: i32 = 4200;
    pub const DISCONNECTED: i32 = 4900;
    pub const CHAIN_DISCONNECTED: i32 = 4901;
    pub const TIMEOUT: i32 = 4902;

    // JSON-RPC 2.0
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Coarse classification of a [`ProviderError`] by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UserRejected,
    Unauthorized,
    UnsupportedMethod,
    Disconnected,
    ChainDisconnected,
    Timeout,
    InvalidParams,
    Internal,
}

impl ErrorKind {
    /// Map a code back to its kind. Unknown codes are internal errors.
    pub fn from_code(code: i32) -> Self {
        match code {
            codes::USER_REJECTED => Self::UserRejected,
            codes::UNAUTHORIZED => Self::Unauthorized,
            codes::UNSUPPORTED_METHOD => Self::UnsupportedMethod,
            codes::DISCONNECTED => Self::Disconnected,
            codes::CHAIN_DISCONNECTED => Self::ChainDisconnected,
            codes::TIMEOUT => Self::Timeout,
            codes::INVALID_PARAMS => Self::InvalidParams,
            _ => Self::Internal,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::UserRejected => codes::USER_REJECTED,
            Self::Unauthorized => codes::UNAUTHORIZED,
            Self::UnsupportedMethod => codes::UNSUPPORTED_METHOD,
            Self::Disconnected => codes::DISCONNECTED,
            Self::ChainDisconnected => codes::CHAIN_DISCONNECTED,
            Self::Timeout => codes::TIMEOUT,
            Self::InvalidParams => codes::INVALID_PARAMS,
            Self::Internal => codes::INTERNAL_ERROR,
        }
    }

    /// Short label used for logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserRejected => "user_rejected",
            Self::Unauthorized => "unauthorized",
            Self::UnsupportedMethod => "unsupported_method",
            Self::Disconnected => "disconnected",
            Self::ChainDisconnected => "chain_disconnected",
            Self::Timeout => "timeout",
            Self::InvalidParams => "invalid_params",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured `{code, message, data?}` error.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

impl ProviderError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach (or replace) the optional data payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_code(self.code)
    }

    pub fn user_rejected() -> Self {
        Self::new(codes::USER_REJECTED, "User rejected the request")
    }

    pub fn unauthorized() -> Self {
        Self::new(
            codes::UNAUTHORIZED,
            "The requested method and/or account has not been authorized",
        )
    }

    pub fn unsupported_method(method: &str) -> Self {
        Self::new(
            codes::UNSUPPORTED_METHOD,
            format!("The requested method is not supported: {}", method),
        )
    }

    pub fn disconnected() -> Self {
        Self::new(
            codes::DISCONNECTED,
            "The provider is disconnected from all chains",
        )
    }

    pub fn chain_disconnected() -> Self {
        Self::new(
            codes::CHAIN_DISCONNECTED,
            "The provider is disconnected from the specified chain",
        )
    }

    pub fn timeout(method: &str) -> Self {
        Self::new(codes::TIMEOUT, format!("Request timed out: {}", method))
    }

    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PARAMS,
            format!("Invalid method parameters: {}", details.into()),
        )
    }

    /// Sanitized internal error. Details stay in the logs, not on the wire.
    pub fn internal() -> Self {
        Self::new(codes::INTERNAL_ERROR, "Internal error")
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderError {}

impl Serialize for ProviderError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let len = if self.data.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("ProviderError", len)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref data) = self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for ProviderError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ErrorHelper {
            code: i32,
            message: String,
            #[serde(default)]
            data: Option<Value>,
        }

        let helper = ErrorHelper::deserialize(deserializer)?;
        Ok(ProviderError {
            code: helper.code,
            message: helper.message,
            data: helper.data,
        })
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::invalid_params(e.to_string())
    }
}

/// Result of a provider call.
pub type ProviderResult<T> = Result<T, ProviderError>;
