//! Handle Service Client Implementation

use handle_service_core::domain::{FetchHandlesParams, Handle, HandleId, NodeId, RpcContext};
use handle_service_core::error::{ClientError, Result};
use handle_service_core::port::{JsonRpcCaller, RpcCall};
use handle_service_infra_http::{AuthToken, CallerConfig, HttpJsonRpcCaller};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// How the client authenticates
#[derive(Clone, Default)]
pub enum Credentials {
    /// No token; only `status` will work
    #[default]
    Anonymous,
    /// Pre-obtained token, validated against the auth service
    Token(String),
    /// User name and password, exchanged for a token at the auth service
    Password { user: String, password: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => f.write_str("Anonymous"),
            Credentials::Token(_) => f.write_str("Token(<redacted>)"),
            Credentials::Password { user, .. } => f
                .debug_struct("Password")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Handle Service Client
///
/// Typed wrappers over the `AbstractHandle` JSON-RPC API. Every method sends
/// exactly one request and returns the single value the server wraps in its
/// result array.
///
/// # Example
///
/// ```no_run
/// use handle_service_sdk::HandleServiceClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HandleServiceClient::with_token(
///     "https://kbase.us/services/handle_service",
///     "MY_TOKEN",
/// )
/// .await?;
/// let handles = client.hids_to_handles(&["KBH_3".to_string()], None).await?;
/// # Ok(())
/// # }
/// ```
pub struct HandleServiceClient<C = HttpJsonRpcCaller> {
    caller: C,
    service_version: Option<String>,
}

impl HandleServiceClient<HttpJsonRpcCaller> {
    /// Anonymous client
    ///
    /// # Errors
    /// - ClientError::InvalidUrl if `url` does not parse
    pub fn new(url: impl AsRef<str>) -> Result<Self> {
        let caller = HttpJsonRpcCaller::new(url.as_ref(), CallerConfig::default())?;
        Ok(Self::from_caller(caller))
    }

    /// Client with a token, validated against the default auth service
    ///
    /// # Errors
    /// - ClientError::Unauthorized if the token is not valid
    /// - ClientError::Transport if the auth service is unreachable
    pub async fn with_token(url: impl AsRef<str>, token: impl Into<String>) -> Result<Self> {
        Self::connect(url, Credentials::Token(token.into()), CallerConfig::default()).await
    }

    /// Client with a token, validated against `auth_url`
    pub async fn with_token_and_auth_url(
        url: impl AsRef<str>,
        token: impl Into<String>,
        auth_url: impl Into<String>,
    ) -> Result<Self> {
        let config = CallerConfig {
            auth_url: auth_url.into(),
            ..Default::default()
        };
        Self::connect(url, Credentials::Token(token.into()), config).await
    }

    /// Client that logs in with user name and password at the default auth service
    ///
    /// # Errors
    /// - ClientError::Unauthorized if the credentials are not valid
    /// - ClientError::Transport if the auth service is unreachable
    pub async fn with_credentials(
        url: impl AsRef<str>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let credentials = Credentials::Password {
            user: user.into(),
            password: password.into(),
        };
        Self::connect(url, credentials, CallerConfig::default()).await
    }

    /// Client that logs in with user name and password at `auth_url`
    pub async fn with_credentials_and_auth_url(
        url: impl AsRef<str>,
        user: impl Into<String>,
        password: impl Into<String>,
        auth_url: impl Into<String>,
    ) -> Result<Self> {
        let credentials = Credentials::Password {
            user: user.into(),
            password: password.into(),
        };
        let config = CallerConfig {
            auth_url: auth_url.into(),
            ..Default::default()
        };
        Self::connect(url, credentials, config).await
    }

    /// General constructor: transport settings apply to the auth round trip too
    pub async fn connect(
        url: impl AsRef<str>,
        credentials: Credentials,
        config: CallerConfig,
    ) -> Result<Self> {
        let url = url.as_ref();
        let caller = match credentials {
            Credentials::Anonymous => HttpJsonRpcCaller::new(url, config)?,
            Credentials::Token(token) => HttpJsonRpcCaller::with_token(url, &token, config).await?,
            Credentials::Password { user, password } => {
                HttpJsonRpcCaller::with_credentials(url, &user, &password, config).await?
            }
        };
        debug!(
            url = %caller.url(),
            user = caller.token().map(AuthToken::user_name).unwrap_or("<anonymous>"),
            "Handle service client ready"
        );
        Ok(Self::from_caller(caller))
    }

    pub fn url(&self) -> &url::Url {
        self.caller.url()
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.caller.token()
    }

    pub fn connection_read_timeout(&self) -> Option<Duration> {
        self.caller.read_timeout()
    }

    /// Time to wait for the server's response; `None` or zero waits forever
    pub fn set_connection_read_timeout(&mut self, timeout: Option<Duration>) {
        self.caller.set_read_timeout(timeout);
    }

    pub fn is_insecure_http_connection_allowed(&self) -> bool {
        self.caller.is_insecure_http_allowed()
    }

    /// Allow the token to travel over plain http:// (default false)
    pub fn set_insecure_http_connection_allowed(&mut self, allowed: bool) {
        self.caller.set_insecure_http_allowed(allowed);
    }

    #[deprecated(note = "use is_insecure_http_connection_allowed")]
    pub fn is_auth_allowed_for_http(&self) -> bool {
        self.is_insecure_http_connection_allowed()
    }

    #[deprecated(note = "use set_insecure_http_connection_allowed")]
    pub fn set_auth_allowed_for_http(&mut self, allowed: bool) {
        self.set_insecure_http_connection_allowed(allowed);
    }

    pub fn is_all_ssl_certificates_trusted(&self) -> bool {
        self.caller.is_trust_all_certificates()
    }

    /// Trust every certificate, self-signed included (default false)
    pub fn set_all_ssl_certificates_trusted(&mut self, trust_all: bool) {
        self.caller.set_trust_all_certificates(trust_all);
    }

    pub fn is_streaming_mode_on(&self) -> bool {
        self.caller.is_streaming()
    }

    /// Stream request bodies in chunks instead of buffering them.
    /// Many servers are not compatible with this.
    pub fn set_streaming_mode_on(&mut self, streaming: bool) {
        self.caller.set_streaming(streaming);
    }

    /// Write the next response to `path` before decoding it (large payloads)
    pub fn set_file_for_next_rpc_response(&self, path: Option<PathBuf>) {
        self.caller.set_response_file(path);
    }
}

impl<C: JsonRpcCaller> HandleServiceClient<C> {
    /// Wrap any caller, e.g. a test double or another transport
    pub fn from_caller(caller: C) -> Self {
        Self {
            caller,
            service_version: None,
        }
    }

    pub fn caller(&self) -> &C {
        &self.caller
    }

    pub fn service_version(&self) -> Option<&str> {
        self.service_version.as_deref()
    }

    /// Pin calls to a deployed service version; `None` uses the server default
    pub fn set_service_version(&mut self, version: Option<String>) {
        self.service_version = version;
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        call: RpcCall,
        context: Option<&RpcContext>,
    ) -> Result<T> {
        let call = call
            .with_context(context)
            .with_service_version(self.service_version.as_deref());
        let method = call.method.clone();

        let value = self
            .caller
            .call(call)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Protocol(format!("{} returned an empty result", method)))?;

        Ok(serde_json::from_value(value)?)
    }

    /// Write a handle to the persistent store; returns its handle id
    pub async fn persist_handle(
        &self,
        handle: &Handle,
        context: Option<&RpcContext>,
    ) -> Result<HandleId> {
        let params = vec![serde_json::to_value(handle)?];
        self.invoke(RpcCall::new("persist_handle", params), context)
            .await
    }

    /// Look handles up by handle id. Superseded by [`Self::fetch_handles_by`].
    pub async fn hids_to_handles(
        &self,
        hids: &[HandleId],
        context: Option<&RpcContext>,
    ) -> Result<Vec<Handle>> {
        let params = vec![serde_json::to_value(hids)?];
        self.invoke(RpcCall::new("hids_to_handles", params), context)
            .await
    }

    /// Look handles up by store node id. Superseded by [`Self::fetch_handles_by`].
    pub async fn ids_to_handles(
        &self,
        ids: &[NodeId],
        context: Option<&RpcContext>,
    ) -> Result<Vec<Handle>> {
        let params = vec![serde_json::to_value(ids)?];
        self.invoke(RpcCall::new("ids_to_handles", params), context)
            .await
    }

    /// Handles whose `field_name` value is one of `elements`
    pub async fn fetch_handles_by(
        &self,
        params: &FetchHandlesParams,
        context: Option<&RpcContext>,
    ) -> Result<Vec<Handle>> {
        let params = vec![serde_json::to_value(params)?];
        self.invoke(RpcCall::new("fetch_handles_by", params), context)
            .await
    }

    /// 1 if the caller owns the data behind every handle, 0 otherwise
    pub async fn is_owner(&self, hids: &[HandleId], context: Option<&RpcContext>) -> Result<i64> {
        let params = vec![serde_json::to_value(hids)?];
        self.invoke(RpcCall::new("is_owner", params), context).await
    }

    /// Delete handles on the server; returns how many were removed
    pub async fn delete_handles(
        &self,
        handles: &[Handle],
        context: Option<&RpcContext>,
    ) -> Result<i64> {
        let params = vec![serde_json::to_value(handles)?];
        self.invoke(RpcCall::new("delete_handles", params), context)
            .await
    }

    /// 1 if the data behind every handle is readable by the caller, 0 otherwise
    pub async fn are_readable(
        &self,
        hids: &[HandleId],
        context: Option<&RpcContext>,
    ) -> Result<i64> {
        let params = vec![serde_json::to_value(hids)?];
        self.invoke(RpcCall::new("are_readable", params), context)
            .await
    }

    pub async fn is_readable(&self, hid: &str, context: Option<&RpcContext>) -> Result<i64> {
        let params = vec![Value::from(hid)];
        self.invoke(RpcCall::new("is_readable", params), context)
            .await
    }

    /// Make the data behind the handles readable by `username`.
    /// Restricted server-side to an allow-list of administrators.
    pub async fn add_read_acl(
        &self,
        hids: &[HandleId],
        username: &str,
        context: Option<&RpcContext>,
    ) -> Result<i64> {
        let params = vec![serde_json::to_value(hids)?, Value::from(username)];
        self.invoke(RpcCall::new("add_read_acl", params), context)
            .await
    }

    /// Make the data behind the handles world-readable. Same restriction as
    /// [`Self::add_read_acl`].
    pub async fn set_public_read(
        &self,
        hids: &[HandleId],
        context: Option<&RpcContext>,
    ) -> Result<i64> {
        let params = vec![serde_json::to_value(hids)?];
        self.invoke(RpcCall::new("set_public_read", params), context)
            .await
    }

    /// Service health snapshot; needs no token
    pub async fn status(&self, context: Option<&RpcContext>) -> Result<Map<String, Value>> {
        self.invoke(RpcCall::new("status", vec![]).without_auth(), context)
            .await
    }
}
