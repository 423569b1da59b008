//! # Relay Messages
//!
//! Everything that travels over a relay connection is a [`RelayMessage`],
//! tagged by its `type` field:
//!
//! ```text
//! page ──WB_REQUEST──▶ relay ──▶ backend
//! page ◀─WB_RESPONSE── relay ◀── backend     (same connection, same id)
//! page ◀─WB_EVENT───── relay ◀── backend     (unsolicited, every connection)
//! page ──WB_PING─────▶ relay ──▶ backend ──WB_PONG──▶ page
//! approval surface ──WB_DECISION──▶ backend
//! ```
//!
//! The transport may drop or reorder any of these; correlation is by id only.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ProviderError, ProviderResult};
use crate::events::{EventName, ProviderEvent};
use crate::ids::RequestId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayMessage {
    #[serde(rename = "WB_REQUEST")]
    Request(RelayRequest),
    #[serde(rename = "WB_RESPONSE")]
    Response(RelayResponse),
    #[serde(rename = "WB_EVENT")]
    Event(RelayEvent),
    #[serde(rename = "WB_PING")]
    Ping(ProbeMessage),
    #[serde(rename = "WB_PONG")]
    Pong(ProbeMessage),
    #[serde(rename = "WB_DECISION")]
    Decision(ApprovalDecision),
}

impl RelayMessage {
    /// Message kind for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Response(_) => "response",
            Self::Event(_) => "event",
            Self::Ping(_) => "ping",
            Self::Pong(_) => "pong",
            Self::Decision(_) => "decision",
        }
    }
}

/// Outbound method call from a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub requires_approval: bool,
    /// Unix milliseconds at creation.
    pub timestamp: i64,
}

impl RelayRequest {
    pub fn new(
        id: RequestId,
        method: impl Into<String>,
        params: Vec<Value>,
        requires_approval: bool,
    ) -> Self {
        Self {
            id,
            method: method.into(),
            params,
            requires_approval,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Answer to a [`RelayRequest`], tagged with the request's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderError>,
}

impl RelayResponse {
    pub fn success(id: RequestId, method: impl Into<String>, result: Value) -> Self {
        Self {
            id,
            method: method.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: RequestId, method: impl Into<String>, error: ProviderError) -> Self {
        Self {
            id,
            method: method.into(),
            result: None,
            error: Some(error),
        }
    }

    pub fn from_result(id: RequestId, method: impl Into<String>, result: ProviderResult<Value>) -> Self {
        match result {
            Ok(value) => Self::success(id, method, value),
            Err(error) => Self::failure(id, method, error),
        }
    }

    /// An error wins over a result; a response with neither is `null`.
    pub fn into_result(self) -> ProviderResult<Value> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Unsolicited event in wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEvent {
    pub event: EventName,
    #[serde(default)]
    pub data: Value,
}

impl From<&ProviderEvent> for RelayEvent {
    fn from(event: &ProviderEvent) -> Self {
        Self {
            event: event.name(),
            data: event.payload(),
        }
    }
}

impl From<ProviderEvent> for RelayEvent {
    fn from(event: ProviderEvent) -> Self {
        Self::from(&event)
    }
}

impl TryFrom<RelayEvent> for ProviderEvent {
    type Error = serde_json::Error;

    fn try_from(event: RelayEvent) -> Result<Self, Self::Error> {
        ProviderEvent::from_wire(event.event, event.data)
    }
}

/// Liveness probe payload shared by ping and pong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeMessage {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Resolve,
    Reject,
}

/// Human decision delivered by the approval surface over its own channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDecision {
    pub action: DecisionAction,
    pub request_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderError>,
}

impl ApprovalDecision {
    pub fn resolve(request_id: RequestId, result: Value) -> Self {
        Self {
            action: DecisionAction::Resolve,
            request_id,
            result: Some(result),
            error: None,
        }
    }

    pub fn reject(request_id: RequestId, error: Option<ProviderError>) -> Self {
        Self {
            action: DecisionAction::Reject,
            request_id,
            result: None,
            error,
        }
    }

    /// Settlement carried by this decision. A reject without an error is a
    /// plain user rejection.
    pub fn into_settlement(self) -> ProviderResult<Value> {
        match self.action {
            DecisionAction::Resolve => Ok(self.result.unwrap_or(Value::Null)),
            DecisionAction::Reject => Err(self.error.unwrap_or_else(ProviderError::user_rejected)),
        }
    }
}
