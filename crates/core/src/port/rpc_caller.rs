// JSON-RPC Caller Port
// Abstraction over the transport that carries one call to the service

use crate::domain::RpcContext;
use crate::error::Result;
use crate::SERVICE_NAME;
use async_trait::async_trait;
use serde_json::Value;

/// One remote call, fully described
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    /// Fully qualified wire method, e.g. `AbstractHandle.persist_handle`
    pub method: String,
    /// Positional arguments
    pub params: Vec<Value>,
    /// Whether the caller expects a value back
    pub expects_result: bool,
    /// Whether the call must carry an auth token
    pub auth_required: bool,
    pub context: Option<RpcContext>,
    /// Pinned service version; `None` targets the server default
    pub service_version: Option<String>,
}

impl RpcCall {
    /// Call `SERVICE_NAME.<method>` with auth required and a result expected
    pub fn new(method: &str, params: Vec<Value>) -> Self {
        Self {
            method: format!("{}.{}", SERVICE_NAME, method),
            params,
            expects_result: true,
            auth_required: true,
            context: None,
            service_version: None,
        }
    }

    pub fn without_auth(mut self) -> Self {
        self.auth_required = false;
        self
    }

    pub fn with_context(mut self, context: Option<&RpcContext>) -> Self {
        self.context = context.cloned();
        self
    }

    pub fn with_service_version(mut self, version: Option<&str>) -> Self {
        self.service_version = version.map(str::to_string);
        self
    }
}

/// JSON-RPC caller trait
///
/// Implementations:
/// - HttpJsonRpcCaller (infra-http): JSON-RPC 1.1 over HTTP(S)
/// - mocks::ScriptedCaller: canned responses for tests
#[async_trait]
pub trait JsonRpcCaller: Send + Sync {
    /// Send the call and return the response's `result` array.
    ///
    /// The array is returned as-is; unwrapping its single element and typing
    /// it is the caller's business. Calls with `expects_result == false` may
    /// return an empty array.
    ///
    /// # Errors
    /// - ClientError::Unauthorized if auth is required and unavailable
    /// - ClientError::Transport / Timeout on network failure
    /// - ClientError::Rpc if the remote method reports an error
    async fn call(&self, call: RpcCall) -> Result<Vec<Value>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::ClientError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays queued responses in order and records every call it sees
    #[derive(Clone, Default)]
    pub struct ScriptedCaller {
        responses: Arc<Mutex<VecDeque<Result<Vec<Value>>>>>,
        calls: Arc<Mutex<Vec<RpcCall>>>,
    }

    impl ScriptedCaller {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a successful response whose result array is `[value]`
        pub fn respond(&self, value: Value) -> &Self {
            self.push(Ok(vec![value]))
        }

        /// Queue a raw result array
        pub fn respond_raw(&self, result: Vec<Value>) -> &Self {
            self.push(Ok(result))
        }

        pub fn fail(&self, err: ClientError) -> &Self {
            self.push(Err(err))
        }

        fn push(&self, response: Result<Vec<Value>>) -> &Self {
            self.responses.lock().unwrap().push_back(response);
            self
        }

        pub fn calls(&self) -> Vec<RpcCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn last_call(&self) -> Option<RpcCall> {
            self.calls.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl JsonRpcCaller for ScriptedCaller {
        async fn call(&self, call: RpcCall) -> Result<Vec<Value>> {
            self.calls.lock().unwrap().push(call.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(ClientError::Protocol(format!(
                        "no scripted response for {}",
                        call.method
                    )))
                })
        }
    }
}
