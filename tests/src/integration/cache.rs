//! # Page Cache Flows
//!
//! The page answers `eth_chainId`, `net_version` and a non-empty
//! `eth_accounts` locally; backend events and approved writes keep that
//! cache current on every open page.

#[cfg(test)]
mod tests {
    use crate::harness::{call, eventually, record, spawn_request, Bridge, ORIGIN_URL};
    use serde_json::json;
    use shared_types::{EventName, ProviderEvent};
    use std::time::Duration;

    #[tokio::test]
    async fn test_chain_changed_event_updates_cache_and_fires_once() {
        let bridge = Bridge::start();
        let client = bridge.page(Some(ORIGIN_URL)).await;
        assert_eq!(call(&client, "eth_chainId", vec![]).await.unwrap(), json!("0x1"));

        let changes = record(&client, EventName::ChainChanged);
        bridge
            .runtime
            .service()
            .publish(ProviderEvent::ChainChanged("0x89".to_string()))
            .await;
        assert!(eventually(Duration::from_secs(1), || !changes.lock().is_empty()).await);

        // The backend still reports 0x1, so 0x89 can only come from the cache.
        assert_eq!(call(&client, "eth_chainId", vec![]).await.unwrap(), json!("0x89"));
        assert_eq!(call(&client, "net_version", vec![]).await.unwrap(), json!("137"));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*changes.lock(), vec![json!("0x89")]);
    }

    #[tokio::test]
    async fn test_approved_chain_switch_reaches_every_page() {
        let mut bridge = Bridge::start();
        let requester = bridge.page(Some(ORIGIN_URL)).await;
        let bystander = bridge.page(Some("https://other.example")).await;
        let bystander_changes = record(&bystander, EventName::ChainChanged);

        let switch = spawn_request(
            &requester,
            "wallet_switchEthereumChain",
            vec![json!({ "chainId": "0x89" })],
        );
        let ticket = bridge.next_prompt().await;
        assert_eq!(ticket.summary, "Switch to chain 0x89");
        bridge.approve(&ticket, json!(null)).await;

        assert_eq!(switch.await.unwrap().unwrap(), json!(null));
        assert!(eventually(Duration::from_secs(1), || bystander.chain_id() == "0x89").await);
        assert_eq!(requester.chain_id(), "0x89");
        assert_eq!(*bystander_changes.lock(), vec![json!("0x89")]);

        // A page opened afterwards syncs the new chain from the backend.
        let late = bridge.page(Some(ORIGIN_URL)).await;
        assert_eq!(late.chain_id(), "0x89");
        assert_eq!(late.network_version(), "137");
    }

    #[tokio::test]
    async fn test_connected_accounts_are_cached_and_shared() {
        let mut bridge = Bridge::start();
        let first = bridge.page(Some(ORIGIN_URL)).await;
        let second = bridge.page(Some(ORIGIN_URL)).await;
        let second_accounts = record(&second, EventName::AccountsChanged);

        let connect = spawn_request(&first, "eth_requestAccounts", vec![]);
        let ticket = bridge.next_prompt().await;
        bridge.approve(&ticket, json!(["0xAbC", "0xdef"])).await;
        assert_eq!(connect.await.unwrap().unwrap(), json!(["0xAbC", "0xdef"]));

        assert_eq!(first.selected_address().as_deref(), Some("0xAbC"));
        assert_eq!(
            call(&first, "eth_accounts", vec![]).await.unwrap(),
            json!(["0xAbC", "0xdef"])
        );

        assert!(eventually(Duration::from_secs(1), || !second_accounts.lock().is_empty()).await);
        assert_eq!(second_accounts.lock()[0], json!(["0xAbC", "0xdef"]));
        assert_eq!(second.selected_address().as_deref(), Some("0xAbC"));

        // The grant is held by the backend, not just the page caches.
        let third = bridge.page(Some(ORIGIN_URL)).await;
        assert_eq!(third.state().accounts(), ["0xAbC".to_string(), "0xdef".to_string()]);
    }
}
