//! Cached chain and account view of one page.

use serde::Serialize;
use shared_types::network_version_of;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderState {
    pub is_connected: bool,
    pub chain_id: String,
    pub network_version: String,
    accounts: Vec<String>,
    selected_address: Option<String>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            is_connected: false,
            chain_id: "0x1".to_string(),
            network_version: "1".to_string(),
            accounts: Vec::new(),
            selected_address: None,
        }
    }
}

impl ProviderState {
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn selected_address(&self) -> Option<&str> {
        self.selected_address.as_deref()
    }

    /// Replace the account list, dropping repeats but keeping order.
    pub fn set_accounts(&mut self, accounts: Vec<String>) {
        let mut unique: Vec<String> = Vec::with_capacity(accounts.len());
        for account in accounts {
            if !unique.iter().any(|a| a.eq_ignore_ascii_case(&account)) {
                unique.push(account);
            }
        }
        self.selected_address = unique.first().cloned();
        self.accounts = unique;
    }

    pub fn clear_accounts(&mut self) {
        self.accounts.clear();
        self.selected_address = None;
    }

    /// Set the chain id and derive the decimal network version from it.
    pub fn set_chain_id(&mut self, chain_id: &str) {
        self.chain_id = chain_id.to_string();
        if let Some(version) = network_version_of(chain_id) {
            self.network_version = version;
        }
    }
}
