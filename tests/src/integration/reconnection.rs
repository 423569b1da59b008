//! # Reconnection Flows
//!
//! Probe failures flip the page to disconnected, a backoff cycle re-probes
//! the relay, and a successful probe restores the page with one full resync.

#[cfg(test)]
mod tests {
    use crate::harness::{call, record, test_config, Bridge, ORIGIN_URL};
    use serde_json::json;
    use shared_types::{codes, EventName};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use wb_03_connection_monitor::ConnectionState;

    #[tokio::test(start_paused = true)]
    async fn test_three_failed_probes_then_success_resyncs_once() {
        let bridge = Bridge::start();
        let (client, link) = bridge.linked_page(Some(ORIGIN_URL)).await;
        let connects = record(&client, EventName::Connect);
        let disconnects = record(&client, EventName::Disconnect);
        let chain_changes = record(&client, EventName::ChainChanged);
        let mut announcements = client.subscribe_announcements();
        assert_eq!(client.resync_count(), 1);

        link.set_up(false);
        let mut states = client.monitor().subscribe();
        // Periodic probe, then attempts 1 and 2, have failed by the time
        // attempt 3 is waiting out its delay.
        states
            .wait_for(|s| *s == ConnectionState::Reconnecting { attempt: 3 })
            .await
            .unwrap();
        assert_eq!(client.monitor().stats().probe_failures.load(Ordering::Relaxed), 3);
        assert_eq!(disconnects.lock().len(), 1);

        link.set_up(true);
        states
            .wait_for(|s| *s == ConnectionState::Connected)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let schedule = client.monitor().last_backoff_schedule();
        assert_eq!(
            schedule,
            vec![Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(8)]
        );
        assert!(schedule.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(client.monitor().current_attempt(), 0);
        assert_eq!(client.resync_count(), 2);
        assert_eq!(connects.lock().len(), 1);
        // Same chain before and after, so the resync reports no change.
        assert!(chain_changes.lock().is_empty());
        assert!(announcements.try_recv().is_ok());
        assert!(announcements.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_after_exhaustion_restarts_the_cycle() {
        let mut config = test_config();
        config.monitor.max_reconnect_attempts = 2;
        let bridge = Bridge::with_config(config);
        let (client, link) = bridge.linked_page(Some(ORIGIN_URL)).await;

        link.set_up(false);
        let mut states = client.monitor().subscribe();
        states
            .wait_for(|s| *s == ConnectionState::Exhausted)
            .await
            .unwrap();

        link.set_up(true);
        let err = call(&client, "eth_blockNumber", vec![]).await.unwrap_err();
        assert_eq!(err.code, codes::DISCONNECTED);

        states
            .wait_for(|s| *s == ConnectionState::Connected)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(call(&client, "eth_blockNumber", vec![]).await.unwrap(), json!("0x1234"));
        assert!(client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_stays_usable_while_healthy() {
        let bridge = Bridge::start();
        let (client, _link) = bridge.linked_page(Some(ORIGIN_URL)).await;

        // Several probe intervals pass without a single failure.
        tokio::time::sleep(Duration::from_secs(45)).await;
        let stats = client.monitor().stats();
        assert!(stats.probes.load(Ordering::Relaxed) >= 4);
        assert_eq!(stats.probe_failures.load(Ordering::Relaxed), 0);
        assert_eq!(client.resync_count(), 1);
        assert_eq!(call(&client, "eth_chainId", vec![]).await.unwrap(), json!("0x1"));
    }
}
