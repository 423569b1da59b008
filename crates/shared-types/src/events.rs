//! Provider events pushed unsolicited from the backend to every page.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Event names a page can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventName {
    AccountsChanged,
    ChainChanged,
    Connect,
    Disconnect,
    Message,
}

impl EventName {
    pub const ALL: [EventName; 5] = [
        EventName::AccountsChanged,
        EventName::ChainChanged,
        EventName::Connect,
        EventName::Disconnect,
        EventName::Message,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Message => "message",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of an event and its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
    Connect { chain_id: String },
    Disconnect { code: i32, message: String },
    Message(Value),
}

impl ProviderEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::AccountsChanged(_) => EventName::AccountsChanged,
            Self::ChainChanged(_) => EventName::ChainChanged,
            Self::Connect { .. } => EventName::Connect,
            Self::Disconnect { .. } => EventName::Disconnect,
            Self::Message(_) => EventName::Message,
        }
    }

    /// Payload as delivered to page listeners.
    pub fn payload(&self) -> Value {
        match self {
            Self::AccountsChanged(accounts) => json!(accounts),
            Self::ChainChanged(chain_id) => json!(chain_id),
            Self::Connect { chain_id } => json!({ "chainId": chain_id }),
            Self::Disconnect { code, message } => json!({ "code": code, "message": message }),
            Self::Message(data) => data.clone(),
        }
    }

    /// Rebuild a typed event from its wire form.
    pub fn from_wire(name: EventName, data: Value) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ConnectInfo {
            chain_id: String,
        }

        #[derive(Deserialize)]
        struct DisconnectInfo {
            code: i32,
            #[serde(default, alias = "reason")]
            message: String,
        }

        Ok(match name {
            EventName::AccountsChanged => Self::AccountsChanged(serde_json::from_value(data)?),
            EventName::ChainChanged => Self::ChainChanged(serde_json::from_value(data)?),
            EventName::Connect => {
                let info: ConnectInfo = serde_json::from_value(data)?;
                Self::Connect {
                    chain_id: info.chain_id,
                }
            }
            EventName::Disconnect => {
                let info: DisconnectInfo = serde_json::from_value(data)?;
                Self::Disconnect {
                    code: info.code,
                    message: info.message,
                }
            }
            EventName::Message => Self::Message(data),
        })
    }
}
