// Port Layer - Interfaces for external dependencies

pub mod rpc_caller;

// Re-exports
pub use rpc_caller::{JsonRpcCaller, RpcCall};
