use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use wb_06_dispatcher::{ChainDataError, ChainDataHandler};

/// Fixed answers per method, for running without a node.
pub struct StaticChainData {
    answers: RwLock<HashMap<String, Value>>,
}

impl StaticChainData {
    pub fn new() -> Self {
        let answers = [
            ("eth_blockNumber", json!("0x1234")),
            ("eth_gasPrice", json!("0x3b9aca00")),
            ("eth_maxPriorityFeePerGas", json!("0x59682f00")),
            ("eth_getBalance", json!("0x0")),
            ("eth_getTransactionCount", json!("0x0")),
            ("eth_getCode", json!("0x")),
            ("eth_syncing", json!(false)),
            ("eth_estimateGas", json!("0x5208")),
            ("eth_call", json!("0x")),
            ("eth_getLogs", json!([])),
            ("net_listening", json!(true)),
        ]
        .into_iter()
        .map(|(method, value)| (method.to_string(), value))
        .collect();
        Self {
            answers: RwLock::new(answers),
        }
    }

    pub fn set(&self, method: impl Into<String>, value: Value) {
        self.answers.write().insert(method.into(), value);
    }
}

impl Default for StaticChainData {
    fn default() -> Self {
        Self::new()
    }
}

/// Answers `web3_clientVersion` with this build's version.
pub struct ClientVersion;

impl ClientVersion {
    pub const METHOD: &'static str = "web3_clientVersion";

    pub fn current() -> String {
        format!("wallet-bridge/v{}", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl ChainDataHandler for ClientVersion {
    async fn handle(&self, _method: &str, _params: &[Value]) -> Result<Value, ChainDataError> {
        Ok(json!(Self::current()))
    }
}

#[async_trait]
impl ChainDataHandler for StaticChainData {
    async fn handle(&self, method: &str, _params: &[Value]) -> Result<Value, ChainDataError> {
        self.answers
            .read()
            .get(method)
            .cloned()
            .ok_or_else(|| ChainDataError::Unsupported(method.to_string()))
    }
}
