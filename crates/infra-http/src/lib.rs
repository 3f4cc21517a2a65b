// Handle Service Infrastructure - HTTP Adapter
// Implements: JsonRpcCaller (JSON-RPC 1.1 over HTTP(S)), auth token resolution

mod auth;
mod caller;
mod config;
mod envelope;

pub use auth::{AuthToken, TokenResolver};
pub use caller::HttpJsonRpcCaller;
pub use config::{CallerConfig, DEFAULT_AUTH_URL, STREAM_CHUNK_SIZE};
pub use envelope::{RpcErrorBody, RpcRequest, RpcResponse, JSON_RPC_VERSION};

// Note: reqwest::Error conversion is done through helper functions in caller.rs
// (orphan rules: cannot implement From<reqwest::Error> for ClientError here)
