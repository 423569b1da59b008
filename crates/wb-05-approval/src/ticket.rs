//! Approval tickets and their human-readable summaries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shared_types::{Origin, RequestId};
use wb_02_method_classifier::{ApprovalView, MethodInfo, MethodTraits};

/// One pending human decision. Serialized as the prompt the surface renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalTicket {
    pub request_id: RequestId,
    pub method: String,
    pub params: Vec<Value>,
    pub origin: Origin,
    pub view: ApprovalView,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub traits: MethodTraits,
}

impl ApprovalTicket {
    pub fn new(request_id: RequestId, info: &MethodInfo, params: Vec<Value>, origin: Origin) -> Self {
        let view = info.view.unwrap_or(ApprovalView::Transaction);
        let summary = summarize(info, &params, &origin);
        Self {
            request_id,
            method: info.name.to_string(),
            params,
            origin,
            view,
            summary,
            created_at: Utc::now(),
            traits: info.traits,
        }
    }

    /// Chain a resolved chain-change switches to, from `params[0].chainId`.
    pub fn target_chain_id(&self) -> Option<&str> {
        self.params.first()?.get("chainId")?.as_str()
    }
}

fn field<'a>(params: &'a [Value], index: usize, key: &str) -> Option<&'a str> {
    params.get(index)?.get(key)?.as_str()
}

fn summarize(info: &MethodInfo, params: &[Value], origin: &Origin) -> String {
    let host = origin.host();
    match info.name {
        "eth_requestAccounts" => format!("Connect accounts to {}", host),
        "wallet_requestPermissions" => format!("Grant permissions to {}", host),
        "wallet_revokePermissions" => format!("Revoke permissions of {}", host),
        "eth_sendTransaction" | "eth_signTransaction" => match field(params, 0, "to") {
            Some(to) => format!("Send transaction to {}", to),
            None => "Deploy contract".to_string(),
        },
        "wallet_switchEthereumChain" => match field(params, 0, "chainId") {
            Some(chain) => format!("Switch to chain {}", chain),
            None => "Switch chain".to_string(),
        },
        "wallet_addEthereumChain" => {
            match (field(params, 0, "chainName"), field(params, 0, "chainId")) {
                (Some(name), Some(chain)) => format!("Add network {} ({})", name, chain),
                (None, Some(chain)) => format!("Add chain {}", chain),
                _ => "Add chain".to_string(),
            }
        }
        "wallet_watchAsset" => {
            match params.first().and_then(|p| p.get("options")).and_then(|o| o.get("symbol")).and_then(Value::as_str) {
                Some(symbol) => format!("Track {}", symbol),
                None => "Track asset".to_string(),
            }
        }
        _ if info.view == Some(ApprovalView::Signature) => format!("Sign message for {}", host),
        _ => info.description.to_string(),
    }
}
