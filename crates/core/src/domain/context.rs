// Per-call RPC context

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which a pinned service version travels in the call context
pub const SERVICE_VERSION_KEY: &str = "service_ver";

/// Optional context object sent with a single call (envelope member `context`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RpcContext(Map<String, Value>);

impl RpcContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge the pinned service version into the context.
    ///
    /// Returns `None` when there is neither a context nor a version to send,
    /// in which case the envelope carries no `context` member at all.
    pub fn for_call(context: Option<&RpcContext>, service_version: Option<&str>) -> Option<Self> {
        match (context, service_version) {
            (None, None) => None,
            (ctx, version) => {
                let mut merged = ctx.cloned().unwrap_or_default();
                if let Some(version) = version {
                    merged
                        .0
                        .insert(SERVICE_VERSION_KEY.to_string(), Value::from(version));
                }
                Some(merged)
            }
        }
    }
}
