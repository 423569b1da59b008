//! In-memory adapters for the dispatcher's outbound ports.

mod chain_data;
mod permissions;
mod surface;

pub use chain_data::{ClientVersion, StaticChainData};
pub use permissions::MemoryPermissionStore;
pub use surface::ChannelApprovalSurface;
