//! Provider self-description announced to the page.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity a page uses to tell wallets apart when several inject providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub uuid: Uuid,
    pub name: String,
    /// Data URI of the wallet icon.
    pub icon: String,
    /// Reverse-DNS identifier, stable across sessions.
    pub rdns: String,
}

impl Default for ProviderInfo {
    fn default() -> Self {
        Self {
            uuid: Uuid::now_v7(),
            name: "Wallet Bridge".to_string(),
            icon: "data:image/svg+xml,<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_string(),
            rdns: "org.walletbridge".to_string(),
        }
    }
}
