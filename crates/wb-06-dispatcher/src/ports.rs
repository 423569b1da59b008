//! Outbound ports to the dispatcher's external collaborators.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{Origin, ProviderError};
use thiserror::Error;

/// Knows which origins the user has connected and with which accounts.
#[async_trait]
pub trait PermissionValidator: Send + Sync {
    async fn is_permission_valid(&self, origin: &Origin) -> bool;

    /// Accounts visible to `origin`. Empty when it holds no grant.
    async fn accounts_for(&self, origin: &Origin) -> Vec<String>;

    /// Record an approved connection.
    async fn grant(&self, origin: &Origin, accounts: Vec<String>);

    /// Drop every grant held by `origin`.
    async fn revoke(&self, origin: &Origin);
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainDataError {
    #[error("no chain data handler for {0}")]
    Unsupported(String),
    #[error("chain unavailable: {0}")]
    Unavailable(String),
    /// Error reported by the node, passed through as-is.
    #[error("rpc error: {0}")]
    Rpc(ProviderError),
}

impl From<ChainDataError> for ProviderError {
    fn from(err: ChainDataError) -> Self {
        match err {
            ChainDataError::Unsupported(method) => ProviderError::unsupported_method(&method),
            ChainDataError::Unavailable(_) => ProviderError::chain_disconnected(),
            ChainDataError::Rpc(error) => error,
        }
    }
}

/// Answers read-only and simulation methods against the chain.
#[async_trait]
pub trait ChainDataHandler: Send + Sync {
    async fn handle(&self, method: &str, params: &[Value]) -> Result<Value, ChainDataError>;
}
