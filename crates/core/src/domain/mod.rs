// Domain Layer - Records exchanged with the handle service

pub mod context;
pub mod handle;
pub mod params;

// Re-exports
pub use context::RpcContext;
pub use handle::{Handle, HandleId, NodeId};
pub use params::FetchHandlesParams;
