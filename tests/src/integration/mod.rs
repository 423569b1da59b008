//! Cross-context flows.

mod approval;
mod cache;
mod classification;
mod reconnection;
mod settlement;
