//! # Background Dispatcher
//!
//! The single privileged entry point for requests arriving from pages.
//!
//! ## Dispatch Pipeline
//!
//! ```text
//! WB_REQUEST ─▶ seen id? ─yes─▶ (dropped)
//!                  │no
//!                  ▼
//!              classify ──unknown──▶ unsupported-method
//!                  │
//!     origin from transport metadata (never from the payload)
//!                  │
//!      ┌───────────┼─────────────────────────┐
//!      ▼           ▼                         ▼
//!  identity read   read / simulation        write
//!  (empty unless   ─▶ chain data            ─▶ origin known? ─no─▶ unauthorized
//!   permitted)                                 ─▶ params valid? ─no─▶ invalid-params
//!                                              ─▶ account-scoped & unpermitted ─▶ unauthorized
//!                                              ─▶ approval ticket ─▶ settle
//! ```
//!
//! Every outcome is normalized into a [`ProviderError`](shared_types::ProviderError)
//! before it leaves this crate. Collaborator panics become a sanitized
//! internal error.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod chain_data;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod ports;
pub mod publisher;
pub mod service;
pub mod validation;

pub use chain_data::ChainDataRouter;
pub use config::{DispatcherConfig, DispatcherConfigError};
pub use dispatcher::BackgroundDispatcher;
pub use ports::{ChainDataError, ChainDataHandler, PermissionValidator};
pub use publisher::MeteredPublisher;
pub use service::{BackgroundService, ServiceConfig, ServiceError};
