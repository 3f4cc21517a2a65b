// HTTP JSON-RPC Caller
// reason: reqwest for HTTP(S) with per-request timeouts and streamed bodies

use crate::auth::{excerpt, AuthToken, TokenResolver};
use crate::config::{CallerConfig, STREAM_CHUNK_SIZE};
use crate::envelope::{RpcRequest, RpcResponse};
use async_trait::async_trait;
use futures::StreamExt;
use handle_service_core::domain::RpcContext;
use handle_service_core::error::{ClientError, Result};
use handle_service_core::port::{JsonRpcCaller, RpcCall};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::error::Error as StdError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// JSON-RPC 1.1 caller over HTTP(S)
///
/// Holds two reqwest clients, one validating certificates and one trusting
/// everything, so the trust flag can flip between calls without a rebuild.
pub struct HttpJsonRpcCaller {
    url: Url,
    token: Option<AuthToken>,
    config: CallerConfig,
    http: reqwest::Client,
    trusting_http: reqwest::Client,
    // One-shot override, consumed by the next call
    response_file: Mutex<Option<PathBuf>>,
}

impl HttpJsonRpcCaller {
    /// Anonymous caller: no token, auth-required calls will fail
    ///
    /// # Errors
    /// - ClientError::InvalidUrl if `url` does not parse
    /// - ClientError::Transport if the HTTP client cannot be initialized
    pub fn new(url: &str, config: CallerConfig) -> Result<Self> {
        Self::build(url, None, config)
    }

    /// Caller with a token already known to be good (no auth service round trip)
    pub fn with_auth_token(url: &str, token: AuthToken, config: CallerConfig) -> Result<Self> {
        Self::build(url, Some(token), config)
    }

    /// Validate `token` against the configured auth service, then build the caller
    ///
    /// # Errors
    /// - ClientError::Unauthorized if the token is not valid
    /// - ClientError::Transport if the auth service is unreachable
    pub async fn with_token(url: &str, token: &str, config: CallerConfig) -> Result<Self> {
        let mut caller = Self::build(url, None, config)?;
        let resolved = caller.resolver()?.validate(token).await?;
        caller.token = Some(resolved);
        Ok(caller)
    }

    /// Log in with user name and password, then build the caller
    ///
    /// # Errors
    /// - ClientError::Unauthorized if the credentials are not valid
    /// - ClientError::Transport if the auth service is unreachable
    pub async fn with_credentials(
        url: &str,
        user: &str,
        password: &str,
        config: CallerConfig,
    ) -> Result<Self> {
        let mut caller = Self::build(url, None, config)?;
        let resolved = caller.resolver()?.login(user, password).await?;
        caller.token = Some(resolved);
        Ok(caller)
    }

    fn build(url: &str, token: Option<AuthToken>, config: CallerConfig) -> Result<Self> {
        let url =
            Url::parse(url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                url
            )));
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| transport_error(e, None))?;
        let trusting_http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| transport_error(e, None))?;

        if config.trust_all_certificates {
            warn!(url = %url, "TLS certificate validation disabled");
        }
        if config.insecure_http_allowed && url.scheme() == "http" {
            warn!(url = %url, "Auth token may be sent over plain http");
        }

        Ok(Self {
            url,
            token,
            config,
            http,
            trusting_http,
            response_file: Mutex::new(None),
        })
    }

    fn resolver(&self) -> Result<TokenResolver> {
        TokenResolver::new(self.client().clone(), &self.config.auth_url)
    }

    fn client(&self) -> &reqwest::Client {
        if self.config.trust_all_certificates {
            &self.trusting_http
        } else {
            &self.http
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub fn config(&self) -> &CallerConfig {
        &self.config
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.config.read_timeout
    }

    /// `None` or zero disables the client-side timeout
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.config.read_timeout = timeout;
    }

    pub fn is_insecure_http_allowed(&self) -> bool {
        self.config.insecure_http_allowed
    }

    pub fn set_insecure_http_allowed(&mut self, allowed: bool) {
        if allowed && !self.config.insecure_http_allowed && self.url.scheme() == "http" {
            warn!(url = %self.url, "Auth token may be sent over plain http");
        }
        self.config.insecure_http_allowed = allowed;
    }

    pub fn is_trust_all_certificates(&self) -> bool {
        self.config.trust_all_certificates
    }

    pub fn set_trust_all_certificates(&mut self, trust_all: bool) {
        if trust_all && !self.config.trust_all_certificates {
            warn!(url = %self.url, "TLS certificate validation disabled");
        }
        self.config.trust_all_certificates = trust_all;
    }

    pub fn is_streaming(&self) -> bool {
        self.config.streaming
    }

    pub fn set_streaming(&mut self, streaming: bool) {
        self.config.streaming = streaming;
    }

    /// Spool the next response body to `path` before parsing it
    pub fn set_response_file(&self, path: Option<PathBuf>) {
        *self
            .response_file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = path;
    }

    pub fn response_file(&self) -> Option<PathBuf> {
        self.response_file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn take_response_file(&self) -> Option<PathBuf> {
        self.response_file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Decide which token, if any, goes into the Authorization header
    fn authorization(&self, call: &RpcCall) -> Result<Option<&str>> {
        let token = match (&self.token, call.auth_required) {
            (Some(token), _) => token,
            (None, true) => {
                return Err(ClientError::Unauthorized(
                    "RPC method requires authentication but credentials were not provided"
                        .to_string(),
                ))
            }
            (None, false) => return Ok(None),
        };

        if self.url.scheme() == "http" && !self.config.insecure_http_allowed {
            if call.auth_required {
                return Err(ClientError::Unauthorized(
                    "RPC method requiring authentication shouldn't be called through \
                     unsecured http, use https instead or allow insecure http connections"
                        .to_string(),
                ));
            }
            // Optional auth: leave the token at home rather than leak it
            debug!(method = %call.method, "Not sending token over insecure http");
            return Ok(None);
        }

        Ok(Some(token.token()))
    }

    fn request_body(&self, body: Vec<u8>) -> reqwest::Body {
        if !self.config.streaming {
            return reqwest::Body::from(body);
        }

        let chunks: Vec<std::io::Result<Vec<u8>>> = body
            .chunks(STREAM_CHUNK_SIZE)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        reqwest::Body::wrap_stream(futures::stream::iter(chunks))
    }

    /// Read the body chunk by chunk; the timeout bounds each read, not the total
    async fn read_body(
        &self,
        response: reqwest::Response,
        spool_to: Option<&Path>,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>> {
        let mut stream = response.bytes_stream();

        let Some(path) = spool_to else {
            let mut bytes = Vec::new();
            while let Some(chunk) = with_read_timeout(timeout, stream.next()).await? {
                bytes.extend_from_slice(&chunk.map_err(|e| transport_error(e, timeout))?);
            }
            return Ok(bytes);
        };

        debug!(path = %path.display(), "Spooling response to file");
        let mut file = tokio::fs::File::create(path).await?;
        while let Some(chunk) = with_read_timeout(timeout, stream.next()).await? {
            let chunk = chunk.map_err(|e| transport_error(e, timeout))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        Ok(tokio::fs::read(path).await?)
    }
}

/// Await `fut`, failing with `ClientError::Timeout` if it takes longer than `timeout`
async fn with_read_timeout<F: Future>(timeout: Option<Duration>, fut: F) -> Result<F::Output> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ClientError::Timeout(limit)),
        None => Ok(fut.await),
    }
}

#[async_trait]
impl JsonRpcCaller for HttpJsonRpcCaller {
    async fn call(&self, call: RpcCall) -> Result<Vec<Value>> {
        // Clear the override up front so a failed call does not leave it armed
        let spool_to = self.take_response_file();

        let id = Uuid::new_v4().to_string();
        let context = RpcContext::for_call(call.context.as_ref(), call.service_version.as_deref());
        let request = RpcRequest::new(&call.method, &call.params, id.clone(), context);
        let body = serde_json::to_vec(&request)?;

        let token = self.authorization(&call)?;
        let timeout = self.config.effective_timeout();

        debug!(
            method = %call.method,
            id = %id,
            authenticated = token.is_some(),
            streaming = self.config.streaming,
            bytes = body.len(),
            "Sending RPC call"
        );

        let mut builder = self
            .client()
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, token);
        }

        // The wait for the response head counts as one read
        let response = with_read_timeout(timeout, builder.body(self.request_body(body)).send())
            .await?
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        let bytes = self
            .read_body(response, spool_to.as_deref(), timeout)
            .await?;
        debug!(method = %call.method, id = %id, status = %status, "RPC response received");

        let result = parse_response(status, &bytes, call.expects_result);
        if let Err(ClientError::Rpc { code, message, .. }) = &result {
            warn!(method = %call.method, code = *code, message = %message, "RPC call failed");
        }
        result
    }
}

/// Interpret an HTTP response as a JSON-RPC result
fn parse_response(status: StatusCode, bytes: &[u8], expects_result: bool) -> Result<Vec<Value>> {
    if status.is_success() {
        let response: RpcResponse = serde_json::from_slice(bytes).map_err(|e| {
            ClientError::Protocol(format!("Malformed JSON-RPC response ({}): {}", e, lossy(bytes)))
        })?;
        return response.into_result(expects_result);
    }

    // KBase servers report method failures as 500 with an error envelope
    if let Ok(RpcResponse {
        error: Some(error), ..
    }) = serde_json::from_slice::<RpcResponse>(bytes)
    {
        return Err(error.into());
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ClientError::Unauthorized(format!(
            "Server returned {}: {}",
            status,
            lossy(bytes)
        )));
    }

    Err(ClientError::Protocol(format!(
        "Server returned {}: {}",
        status,
        lossy(bytes)
    )))
}

fn lossy(bytes: &[u8]) -> String {
    excerpt(&String::from_utf8_lossy(bytes))
}

/// Map a reqwest failure onto the I/O error class
pub(crate) fn transport_error(err: reqwest::Error, timeout: Option<Duration>) -> ClientError {
    if err.is_timeout() {
        if let Some(timeout) = timeout {
            return ClientError::Timeout(timeout);
        }
    }

    // reqwest's top-level message hides the interesting part in the source chain
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    ClientError::Transport(message)
}
