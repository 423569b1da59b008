//! # Shared Bus - Relay Plumbing
//!
//! The pieces every context uses to talk over a relay connection.
//!
//! ```text
//! ┌──────────────┐   RelayPort::send   ┌──────────────┐
//! │ Page client  │ ──────────────────▶ │  Background  │
//! │              │ ◀────────────────── │  dispatcher  │
//! └──────────────┘   RelayPort::send   └──────┬───────┘
//!                                             │ publish()
//!                                             ▼
//!                                    ┌──────────────────┐
//!                                    │ EventBroadcaster │ ──▶ every attached relay
//!                                    └──────────────────┘
//! ```
//!
//! - **Transport seam:** [`RelayPort`] hides how bytes move; the in-memory
//!   [`channel`] implementation backs tests and the local runtime.
//! - **Best-effort fan-out:** [`EventBroadcaster`] skips closed relays and
//!   never lets one relay's failure reach another.
//! - **Duplicate filtering:** [`SeenIdCache`] remembers a bounded window of
//!   ids and forgets the oldest first.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod broadcaster;
pub mod seen_cache;
pub mod transport;

pub use broadcaster::{BroadcastReport, EventBroadcaster, EventPublisher};
pub use seen_cache::SeenIdCache;
pub use transport::{channel, ConnectionId, ConnectionMetadata, RelayPort, TransportError};

/// Messages buffered per direction on an in-memory relay.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
