//! Connects the monitor to the client without an ownership cycle.

use crate::client::ProviderClient;
use async_trait::async_trait;
use std::sync::Weak;
use wb_03_connection_monitor::{ConnectionObserver, LivenessProbe, ProbeError};

pub(crate) struct ClientLink(pub(crate) Weak<ProviderClient>);

#[async_trait]
impl LivenessProbe for ClientLink {
    async fn probe(&self) -> Result<(), ProbeError> {
        match self.0.upgrade() {
            Some(client) => client.send_probe().await,
            None => Err(ProbeError::Unreachable("provider dropped".to_string())),
        }
    }
}

#[async_trait]
impl ConnectionObserver for ClientLink {
    async fn connection_lost(&self) {
        if let Some(client) = self.0.upgrade() {
            client.on_connection_lost();
        }
    }

    async fn connection_restored(&self) {
        if let Some(client) = self.0.upgrade() {
            client.on_connection_restored().await;
        }
    }
}
