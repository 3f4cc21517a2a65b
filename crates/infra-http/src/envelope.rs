// JSON-RPC 1.1 Envelope
// Request/response shapes spoken by KBase-style services

use handle_service_core::domain::RpcContext;
use handle_service_core::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSON_RPC_VERSION: &str = "1.1";

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub version: &'static str,
    pub method: &'a str,
    pub params: &'a [Value],
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RpcContext>,
}

impl<'a> RpcRequest<'a> {
    pub fn new(
        method: &'a str,
        params: &'a [Value],
        id: String,
        context: Option<RpcContext>,
    ) -> Self {
        Self {
            version: JSON_RPC_VERSION,
            method,
            params,
            id,
            context,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

/// Error member of a failed response
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default = "default_error_name")]
    pub name: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    /// Server detail; KBase servers put the traceback in `error`, 2.0 servers in `data`
    #[serde(default, alias = "data")]
    pub error: Option<Value>,
}

fn default_error_name() -> String {
    "JSONRPCError".to_string()
}

impl From<RpcErrorBody> for ClientError {
    fn from(body: RpcErrorBody) -> Self {
        let data = match body.error {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        ClientError::Rpc {
            code: body.code,
            name: body.name,
            message: body.message,
            data,
        }
    }
}

impl RpcResponse {
    /// Turn the response into the raw `result` array
    pub fn into_result(self, expects_result: bool) -> Result<Vec<Value>> {
        if let Some(error) = self.error {
            return Err(error.into());
        }

        match self.result {
            Some(Value::Array(values)) => Ok(values),
            Some(other) => Err(ClientError::Protocol(format!(
                "Expected a result array, got {}",
                json_kind(&other)
            ))),
            None if expects_result => Err(ClientError::Protocol(
                "An error occurred in the server: response carries no result".to_string(),
            )),
            None => Ok(Vec::new()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
