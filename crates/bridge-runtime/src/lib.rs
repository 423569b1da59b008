//! # Wallet Bridge Runtime
//!
//! Wires one background context and any number of page providers together
//! in a single process, connected by in-memory relays.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logs and metrics)
//! 2. Load configuration (`WB_CONFIG` JSON file, then environment overrides)
//! 3. Build the background service with in-memory permission, chain-data and
//!    approval-surface adapters
//! 4. Start the decision side channel and maintenance tasks
//! 5. Open page relays on demand, each with its own provider client
//!
//! ## Modules
//!
//! - `adapters/` - in-memory implementations of the dispatcher's ports
//! - `config` - [`BridgeConfig`] loading and validation
//! - `runtime` - [`BridgeRuntime`] wiring

pub mod adapters;
pub mod config;
pub mod runtime;

pub use config::{BridgeConfig, ConfigError};
pub use runtime::{ApprovalDesk, BridgeRuntime, RuntimeError};
