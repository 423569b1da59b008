//! # Approval Gating Flows
//!
//! Writes always reach the approval surface; reads never do. Identical
//! writes share one prompt, and a page whose origin cannot be resolved is
//! limited to reads.

#[cfg(test)]
mod tests {
    use crate::harness::{call, eventually, record, spawn_request, Bridge, ORIGIN_URL};
    use bridge_runtime::BridgeConfig;
    use serde_json::json;
    use shared_types::{codes, EventName};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_reads_never_prompt_for_unpermitted_origin() {
        let mut bridge = Bridge::start();
        let client = bridge.page(Some(ORIGIN_URL)).await;

        assert_eq!(call(&client, "eth_accounts", vec![]).await.unwrap(), json!([]));
        assert_eq!(call(&client, "eth_coinbase", vec![]).await.unwrap(), json!(null));
        assert_eq!(call(&client, "wallet_getPermissions", vec![]).await.unwrap(), json!([]));
        assert_eq!(call(&client, "eth_blockNumber", vec![]).await.unwrap(), json!("0x1234"));
        assert_eq!(call(&client, "eth_estimateGas", vec![json!({})]).await.unwrap(), json!("0x5208"));

        assert!(bridge.no_prompt_waiting());
        assert_eq!(bridge.runtime.service().approvals().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_write_prompts_and_reject_settles_user_rejected() {
        let mut bridge = Bridge::start();
        let client = bridge.page(Some(ORIGIN_URL)).await;

        let connect = spawn_request(&client, "eth_requestAccounts", vec![]);
        let ticket = bridge.next_prompt().await;
        assert_eq!(ticket.method, "eth_requestAccounts");
        assert_eq!(ticket.origin.as_str(), "https://dapp.example");
        assert_eq!(ticket.summary, "Connect accounts to dapp.example");

        bridge.reject(&ticket).await;
        let err = connect.await.unwrap().unwrap_err();
        assert_eq!(err.code, codes::USER_REJECTED);
        assert!(client.selected_address().is_none());
    }

    #[tokio::test]
    async fn test_account_scoped_write_needs_a_grant() {
        let mut bridge = Bridge::start();
        let client = bridge.page(Some(ORIGIN_URL)).await;
        let sign = vec![json!("0x68656c6c6f"), json!("0xabc")];

        let err = call(&client, "personal_sign", sign.clone()).await.unwrap_err();
        assert_eq!(err.code, codes::UNAUTHORIZED);
        assert!(bridge.no_prompt_waiting());

        let connect = spawn_request(&client, "eth_requestAccounts", vec![]);
        let ticket = bridge.next_prompt().await;
        bridge.approve(&ticket, json!(["0xabc"])).await;
        connect.await.unwrap().unwrap();

        let signed = spawn_request(&client, "personal_sign", sign);
        let ticket = bridge.next_prompt().await;
        assert_eq!(ticket.summary, "Sign message for dapp.example");
        bridge.approve(&ticket, json!("0xsignature")).await;
        assert_eq!(signed.await.unwrap().unwrap(), json!("0xsignature"));
    }

    #[tokio::test]
    async fn test_granted_accounts_stay_with_their_origin() {
        let mut bridge = Bridge::start();
        let client = bridge.page(Some(ORIGIN_URL)).await;
        let same_origin = bridge.page(Some("https://dapp.example/other")).await;
        let bystander = bridge.page(Some("https://evil.example/")).await;
        let same_origin_accounts = record(&same_origin, EventName::AccountsChanged);
        let bystander_accounts = record(&bystander, EventName::AccountsChanged);
        let bystander_connects = record(&bystander, EventName::Connect);

        let connect = spawn_request(&client, "eth_requestAccounts", vec![]);
        let ticket = bridge.next_prompt().await;
        bridge.approve(&ticket, json!(["0xabc"])).await;
        assert_eq!(connect.await.unwrap().unwrap(), json!(["0xabc"]));

        assert!(eventually(Duration::from_secs(1), || !same_origin_accounts.lock().is_empty()).await);
        assert_eq!(same_origin.selected_address().as_deref(), Some("0xabc"));

        assert!(bystander_accounts.lock().is_empty());
        assert!(bystander_connects.lock().is_empty());
        assert!(bystander.selected_address().is_none());
        assert_eq!(call(&bystander, "eth_accounts", vec![]).await.unwrap(), json!([]));
        assert_eq!(call(&bystander, "eth_coinbase", vec![]).await.unwrap(), json!(null));
    }

    #[tokio::test]
    async fn test_identical_requests_share_one_prompt() {
        let mut bridge = Bridge::start();
        let first = bridge.page(Some(ORIGIN_URL)).await;
        let second = bridge.page(Some(ORIGIN_URL)).await;

        let a = spawn_request(&first, "eth_requestAccounts", vec![]);
        let ticket = bridge.next_prompt().await;
        let b = spawn_request(&second, "eth_requestAccounts", vec![]);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(bridge.no_prompt_waiting());

        bridge.approve(&ticket, json!(["0xabc"])).await;
        assert_eq!(a.await.unwrap().unwrap(), json!(["0xabc"]));
        assert_eq!(b.await.unwrap().unwrap(), json!(["0xabc"]));
    }

    #[tokio::test]
    async fn test_unknown_origin_is_limited_to_reads() {
        let mut bridge = Bridge::start();
        let client = bridge.page(None).await;

        assert_eq!(call(&client, "eth_blockNumber", vec![]).await.unwrap(), json!("0x1234"));
        assert_eq!(call(&client, "eth_accounts", vec![]).await.unwrap(), json!([]));

        let err = call(&client, "eth_requestAccounts", vec![]).await.unwrap_err();
        assert_eq!(err.code, codes::UNAUTHORIZED);
        let err = call(&client, "wallet_switchEthereumChain", vec![json!({ "chainId": "0x89" })])
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::UNAUTHORIZED);
        assert!(bridge.no_prompt_waiting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecided_prompt_settles_as_rejection() {
        let config = BridgeConfig::default();
        let approval_timeout = config.service.approval.timeout;
        let approval_wait = config.provider.approval_wait;
        let mut bridge = Bridge::with_config(config);
        let client = bridge.page(Some(ORIGIN_URL)).await;

        let started = Instant::now();
        let connect = spawn_request(&client, "eth_requestAccounts", vec![]);
        bridge.next_prompt().await;

        let err = connect.await.unwrap().unwrap_err();
        assert_eq!(err.code, codes::USER_REJECTED);
        assert_eq!(err.data.unwrap()["reason"], "approval timed out");
        assert!(started.elapsed() >= approval_timeout);
        assert!(started.elapsed() < approval_wait);
        assert_eq!(bridge.runtime.service().approvals().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_and_malformed_requests_never_prompt() {
        let mut bridge = Bridge::start();
        let client = bridge.page(Some(ORIGIN_URL)).await;

        let err = call(&client, "eth_mine", vec![]).await.unwrap_err();
        assert_eq!(err.code, codes::UNSUPPORTED_METHOD);

        let err = call(&client, "wallet_switchEthereumChain", vec![]).await.unwrap_err();
        assert_eq!(err.code, codes::INVALID_PARAMS);

        assert!(bridge.no_prompt_waiting());
    }
}
