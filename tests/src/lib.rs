//! # Wallet Bridge Test Suite
//!
//! End-to-end flows that run a page provider, the relay and the background
//! context together in one process.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs          # Bridge fixture, switchable links, event recorders
//! └── integration/
//!     ├── settlement.rs   # exactly-once, timeouts, disconnect cancellation
//!     ├── cache.rs        # page cache against backend events
//!     ├── approval.rs     # approval gating, coalescing, unknown origins
//!     ├── reconnection.rs # probe failure, backoff and resync
//!     └── classification.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p wb-tests
//!
//! # By area
//! cargo test -p wb-tests integration::approval::
//! cargo test -p wb-tests integration::reconnection::
//! ```

#![allow(dead_code)]

pub mod harness;
pub mod integration;
