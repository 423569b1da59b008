//! # Provider Client
//!
//! The object a page talks to. It lives in the page context, owns the cached
//! chain/account view and turns `request()` calls into relay messages whose
//! responses it correlates back by id.
//!
//! ## Guarantees
//!
//! | Guarantee | Where |
//! |-----------|-------|
//! | `selected_address == accounts[0]` | `state.rs`, every mutation goes through it |
//! | A response settles at most once | processed-id window plus the registry's atomic take |
//! | Every call settles | request timeout, relay loss and `disconnect` all settle pending calls |
//! | Calls wait for readiness | `request()` awaits the ready signal first |
//!
//! ## Request Path
//!
//! ```text
//! request() ─▶ ready? ─▶ cache hit? ──yes──▶ return
//!                            │no
//!                            ▼
//!              register ─▶ WB_REQUEST ─▶ relay ... WB_RESPONSE ─▶ dedup ─▶ take ─▶ update state ─▶ settle
//!                 │                                                                                 ▲
//!                 └──────────────────── timeout / relay loss / disconnect ──────────────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod announce;
pub mod client;
pub mod config;
mod link;
pub mod listeners;
pub mod state;

pub use announce::ProviderInfo;
pub use client::{ProviderClient, RequestArguments};
pub use config::{ProviderConfig, ProviderConfigError};
pub use listeners::{EventListeners, ListenerId};
pub use state::ProviderState;
