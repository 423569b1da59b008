//! Registry domain layer.

pub mod errors;
pub mod fingerprint;
pub mod registry;
pub mod request;
