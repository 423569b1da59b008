//! # Wallet Bridge Runtime
//!
//! Runs the background context with in-memory adapters and one page
//! connected at startup. Approval prompts are logged; they settle as user
//! rejections when they time out.

use anyhow::Result;
use bridge_runtime::{BridgeConfig, BridgeRuntime};
use bridge_telemetry::{init_telemetry, TelemetryConfig};
use shared_types::EventName;
use tracing::{error, info, warn};
use wb_04_provider_client::RequestArguments;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())?;

    let config = BridgeConfig::load()?;
    let (runtime, mut desk) = BridgeRuntime::start(config)?;

    tokio::spawn(async move {
        while let Some(ticket) = desk.prompts.recv().await {
            match serde_json::to_string(&ticket) {
                Ok(json) => info!(request_id = %ticket.request_id, ticket = %json, "Approval requested"),
                Err(e) => warn!(request_id = %ticket.request_id, "Unprintable ticket: {}", e),
            }
        }
    });

    let page_url = runtime.config().page_url.clone();
    let client = runtime.open_page(Some(&page_url))?;
    client.on(EventName::ChainChanged, |chain| info!(%chain, "Page saw chainChanged"));
    client.on(EventName::Disconnect, |err| warn!(%err, "Page saw disconnect"));

    client.ready().await;
    match client.request(RequestArguments::new("eth_chainId")).await {
        Ok(chain) => info!(%chain, connected = client.is_connected(), "Page provider ready"),
        Err(e) => error!(code = e.code, "Page provider failed its first request: {}", e),
    }

    info!("Bridge running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    runtime.shutdown();
    Ok(())
}
