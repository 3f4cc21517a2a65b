// HTTP Caller Configuration

use std::time::Duration;

/// Default KBase auth service root
pub const DEFAULT_AUTH_URL: &str = "https://kbase.us/services/auth";

/// Chunk size used for streamed request bodies
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Transport knobs for [`crate::HttpJsonRpcCaller`]
#[derive(Debug, Clone)]
pub struct CallerConfig {
    /// Read timeout per call; `None` or zero means wait indefinitely
    pub read_timeout: Option<Duration>,
    /// Allow tokens to be sent over plain http://
    pub insecure_http_allowed: bool,
    /// Skip TLS certificate validation (self-signed deployments)
    pub trust_all_certificates: bool,
    /// Send request bodies as a chunked stream instead of one buffer
    pub streaming: bool,
    /// Root of the auth service used to validate tokens and log in
    pub auth_url: String,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            read_timeout: None,
            insecure_http_allowed: false,
            trust_all_certificates: false,
            streaming: false,
            auth_url: DEFAULT_AUTH_URL.to_string(),
        }
    }
}

impl CallerConfig {
    /// Effective timeout: zero collapses to "no timeout"
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.read_timeout.filter(|d| !d.is_zero())
    }
}
