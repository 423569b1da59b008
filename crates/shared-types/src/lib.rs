//! # Shared Types Crate
//!
//! Types that cross a context boundary: the page, the relay, the background
//! dispatcher and the approval surface all speak in these shapes.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every relay message shape is defined here.
//! - **Structured Errors Only**: anything that crosses the relay as a failure
//!   is a [`ProviderError`] with a fixed numeric code.
//! - **Transport-Derived Origin**: [`Origin`] is only ever built from relay
//!   metadata, never read out of a payload.

pub mod chain;
pub mod errors;
pub mod events;
pub mod ids;
pub mod messages;
pub mod origin;

pub use chain::network_version_of;
pub use errors::*;
pub use events::*;
pub use ids::RequestId;
pub use messages::*;
pub use origin::{Origin, OriginError};
