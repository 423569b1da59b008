//! # Connection Monitor
//!
//! Knows whether the relay is reachable and drives recovery when it is not.
//!
//! ```text
//!                 probe ok
//!             ┌──────────────┐
//!             ▼              │
//!       ┌───────────┐  probe failed  ┌──────────────┐  attempt n failed
//!       │ CONNECTED │ ─────────────▶ │ RECONNECTING │ ──────┐ (backoff 2^n)
//!       └───────────┘                └──────────────┘ ◀─────┘
//!             ▲                        │          │
//!             │      probe ok          │          │ max attempts
//!             └────────────────────────┘          ▼
//!                 (resync once)            ┌───────────┐
//!                                          │ EXHAUSTED │ ── restart() ──▶ RECONNECTING
//!                                          └───────────┘
//! ```
//!
//! The monitor never returns an error to its callers. Probe failures become
//! state transitions, and the [`ConnectionObserver`] hears about losses and
//! recoveries.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod backoff;
pub mod config;
pub mod monitor;
pub mod ports;

pub use backoff::BackoffPolicy;
pub use config::{MonitorConfig, MonitorConfigError};
pub use monitor::{ConnectionMonitor, ConnectionState, MonitorStats};
pub use ports::{ConnectionObserver, LivenessProbe, ProbeError};
