//! # Settlement Flows
//!
//! Every page request settles exactly once: by its response, by its timeout,
//! or by a disconnect that cancels the whole registry.

#[cfg(test)]
mod tests {
    use crate::harness::{call, eventually, record, spawn_request, test_config, Bridge, ORIGIN_URL};
    use serde_json::json;
    use shared_types::{codes, EventName, ProviderEvent};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_duplicate_responses_settle_once() {
        let bridge = Bridge::start();
        let (client, link) = bridge.linked_page(Some(ORIGIN_URL)).await;
        link.duplicate_responses(true);

        let block = call(&client, "eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(block, json!("0x1234"));

        // Give the second copy time to arrive and be discarded.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stats = client.registry().stats();
        // Two startup resync reads plus the request above.
        assert_eq!(stats.total_settled.load(Ordering::Relaxed), 3);
        assert!(client.registry().is_empty());

        // The client keeps working after discarding the duplicate.
        let balance = call(&client, "eth_getBalance", vec![json!("0xabc"), json!("latest")])
            .await
            .unwrap();
        assert_eq!(balance, json!("0x0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_request_times_out_within_window() {
        let mut config = test_config();
        config.provider.request_timeout = Duration::from_secs(5);
        let bridge = Bridge::with_config(config);
        let (client, link) = bridge.linked_page(Some(ORIGIN_URL)).await;

        link.set_up(false);
        let started = Instant::now();
        let err = call(&client, "eth_blockNumber", vec![]).await.unwrap_err();

        assert_eq!(err.code, codes::TIMEOUT);
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(6));
        assert!(client.registry().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_event_cancels_every_pending_request() {
        let mut bridge = Bridge::start();
        let client = bridge.page(Some(ORIGIN_URL)).await;
        let disconnects = record(&client, EventName::Disconnect);

        let pending: Vec<_> = ["0x89", "0xa", "0x2105"]
            .into_iter()
            .map(|chain| {
                spawn_request(&client, "wallet_switchEthereumChain", vec![json!({ "chainId": chain })])
            })
            .collect();
        for _ in 0..3 {
            bridge.next_prompt().await;
        }
        assert_eq!(client.registry().len(), 3);

        bridge
            .runtime
            .service()
            .publish(ProviderEvent::Disconnect {
                code: codes::DISCONNECTED,
                message: "Chain halted".to_string(),
            })
            .await;

        for request in pending {
            let err = request.await.unwrap().unwrap_err();
            assert_eq!(err.code, codes::DISCONNECTED);
        }
        assert!(client.registry().is_empty());
        assert_eq!(disconnects.lock().len(), 1);
        assert!(client.state().accounts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_loss_cancels_every_pending_request() {
        let bridge = Bridge::start();
        let (client, link) = bridge.linked_page(Some(ORIGIN_URL)).await;

        link.set_up(false);
        let started = Instant::now();
        let pending: Vec<_> = (0..4)
            .map(|_| spawn_request(&client, "eth_blockNumber", vec![]))
            .collect();
        assert!(eventually(Duration::from_secs(1), || client.registry().len() == 4).await);

        for request in pending {
            let err = request.await.unwrap().unwrap_err();
            assert_eq!(err.code, codes::DISCONNECTED);
        }
        // Cancelled by the failed probe, well before the request timeout.
        assert!(started.elapsed() < test_config().provider.request_timeout);
        assert!(client.registry().is_empty());
        assert!(!client.monitor().is_connected());
    }

    #[tokio::test]
    async fn test_closed_page_rejects_new_requests() {
        let bridge = Bridge::start();
        let client = bridge.page(Some(ORIGIN_URL)).await;
        assert!(bridge.runtime.close_page(&client));

        let err = call(&client, "eth_blockNumber", vec![]).await.unwrap_err();
        assert_eq!(err.code, codes::DISCONNECTED);
    }
}
