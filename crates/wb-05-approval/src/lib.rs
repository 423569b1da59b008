//! # Approval Orchestration
//!
//! Holds write-class requests until a human decides on them.
//!
//! ```text
//! submit(ticket) ──▶ coalesce? ──yes──▶ wait on the live ticket
//!                       │no
//!                       ▼
//!               queue full? ──yes──▶ user-rejected
//!                       │no
//!                       ▼
//!   register (timeout ⇒ user-rejected) ─▶ surface.open(ticket) ─▶ wait
//!                                                                   ▲
//!        WB_DECISION {resolve|reject} ─▶ decide() ─▶ settle ────────┘
//! ```
//!
//! A resolved identity-revealing write is followed by `accountsChanged` and
//! `connect`; a resolved chain change by `chainChanged` and `connect`. Both go
//! to every attached relay through the [`EventPublisher`](shared_bus::EventPublisher).

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod orchestrator;
pub mod surface;
pub mod ticket;

pub use config::{ApprovalConfig, ApprovalConfigError};
pub use orchestrator::ApprovalOrchestrator;
pub use surface::{ApprovalSurface, SurfaceError};
pub use ticket::ApprovalTicket;
