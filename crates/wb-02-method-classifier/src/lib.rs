//! # Method Classifier
//!
//! Maps a provider method name to its category:
//!
//! | Category | Approval | Answered by |
//! |----------|----------|-------------|
//! | `ReadOnly` | never | chain-data collaborator, or the permission store for identity reads |
//! | `Simulation` | never | chain-data collaborator, never a cache |
//! | `Write` | always | approval orchestration |
//!
//! Unknown methods are unsupported. They never fall back to a category.
//!
//! The table is plain data: adding a method is one entry in
//! [`STANDARD_METHODS`] (or a [`MethodClassifier::with_method`] call), never a
//! change to dispatch logic. Each broker owns its own [`MethodClassifier`].

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;

pub use domain::classifier::MethodClassifier;
pub use domain::methods::{
    ApprovalView, MethodCategory, MethodInfo, MethodTraits, STANDARD_METHODS,
};
