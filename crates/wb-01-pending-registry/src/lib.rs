//! # Pending Request Registry
//!
//! Table of outstanding requests keyed by [`RequestId`], used on both sides of
//! the relay: the page client parks callers here until a response arrives and
//! the backend parks approval tickets here until a human decides.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | At most one live entry per id | `register()` uses the map's entry API |
//! | Settled at most once | every exit path goes through an atomic `remove` |
//! | Late timeout is a no-op | `expire()` on an absent id returns `false` |
//! | Disconnect empties the table | `cancel_all()` |
//!
//! ## Lifecycle
//!
//! ```text
//! register() ──▶ [LIVE] ──settle()──────▶ caller gets result/error
//!                  │  ├──expire()──────▶ caller gets the entry's expiry error
//!                  │  └──cancel_all()──▶ caller gets the cancel error
//!                  └── coalesce() attaches followers that share the settlement
//! ```
//!
//! [`RequestId`]: shared_types::RequestId

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;

pub use domain::errors::RegistryError;
pub use domain::fingerprint::RequestFingerprint;
pub use domain::registry::{cleanup_task, PendingHandle, PendingRegistry, PendingStats, TakenRequest};
pub use domain::request::{PendingRequest, RegistryConfig, Settlement};
