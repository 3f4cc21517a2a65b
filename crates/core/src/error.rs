// Central Error Type for the Handle Service client

use std::time::Duration;
use thiserror::Error;

/// Client error.
///
/// Three classes reach the caller: I/O (`Transport`, `Timeout`, `Io`),
/// authorization (`Unauthorized`) and remote failures (`Rpc`). The rest
/// describe responses or inputs the client could not make sense of.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("RPC error ({code}) {name}: {message}")]
    Rpc {
        code: i64,
        name: String,
        message: String,
        /// Server-side detail, usually a traceback
        data: Option<String>,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// True for network, timeout and local I/O failures
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Timeout(_) | ClientError::Io(_)
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }

    /// Error code reported by the server, if this is a remote failure
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            ClientError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias using ClientError
pub type Result<T> = std::result::Result<T, ClientError>;
