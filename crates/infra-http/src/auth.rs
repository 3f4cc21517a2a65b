// Auth Token Resolution
// Validates tokens and exchanges user/password for a token against the auth service

use crate::caller::transport_error;
use handle_service_core::error::{ClientError, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};
use url::Url;

const TOKEN_PATH: &str = "api/V2/token";
const LOGIN_PATH: &str = "api/legacy/KBase/Sessions/Login";

/// Token plus the user it was issued to
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    token: String,
    user_name: String,
}

impl AuthToken {
    pub fn new(token: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_name: user_name.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }
}

// Never print the secret
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("user_name", &self.user_name)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenInfo {
    user: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

/// Talks to the auth service
pub struct TokenResolver {
    http: reqwest::Client,
    auth_url: Url,
}

impl TokenResolver {
    /// # Errors
    /// - ClientError::InvalidUrl if `auth_url` does not parse
    pub fn new(http: reqwest::Client, auth_url: &str) -> Result<Self> {
        // Trailing slash so relative joins keep the last path segment
        let normalized = format!("{}/", auth_url.trim_end_matches('/'));
        let auth_url = Url::parse(&normalized)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", auth_url, e)))?;

        if auth_url.scheme() == "http" {
            warn!(auth_url = %auth_url, "Auth service reached over plain http");
        }

        Ok(Self { http, auth_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.auth_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{}{}: {}", self.auth_url, path, e)))
    }

    /// Check a token with the auth service and learn who owns it
    ///
    /// # Errors
    /// - ClientError::Unauthorized if the service rejects the token
    /// - ClientError::Transport if the service is unreachable
    pub async fn validate(&self, token: &str) -> Result<AuthToken> {
        let endpoint = self.endpoint(TOKEN_PATH)?;
        debug!(endpoint = %endpoint, "Validating auth token");

        let response = self
            .http
            .get(endpoint)
            .header(reqwest::header::AUTHORIZATION, token)
            .send()
            .await
            .map_err(|e| transport_error(e, None))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, None))?;

        if is_rejection(status) {
            return Err(ClientError::Unauthorized(format!(
                "Token rejected by auth service: {}",
                error_message(&body).unwrap_or_else(|| status.to_string())
            )));
        }
        if !status.is_success() {
            return Err(ClientError::Protocol(format!(
                "Auth service returned {}: {}",
                status,
                excerpt(&body)
            )));
        }

        let info: TokenInfo = serde_json::from_str(&body)?;
        info!(user = %info.user, "Auth token validated");

        Ok(AuthToken::new(token, info.user))
    }

    /// Exchange user name and password for a token
    ///
    /// # Errors
    /// - ClientError::Unauthorized if the credentials are not valid
    /// - ClientError::Transport if the service is unreachable
    pub async fn login(&self, user: &str, password: &str) -> Result<AuthToken> {
        let endpoint = self.endpoint(LOGIN_PATH)?;
        debug!(endpoint = %endpoint, user = %user, "Logging in");

        let response = self
            .http
            .post(endpoint)
            .form(&[
                ("user_id", user),
                ("password", password),
                ("fields", "token,user_id"),
            ])
            .send()
            .await
            .map_err(|e| transport_error(e, None))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, None))?;

        if is_rejection(status) {
            return Err(ClientError::Unauthorized(format!(
                "Login failed for user {}: {}",
                user,
                error_message(&body).unwrap_or_else(|| status.to_string())
            )));
        }
        if !status.is_success() {
            return Err(ClientError::Protocol(format!(
                "Auth service returned {}: {}",
                status,
                excerpt(&body)
            )));
        }

        let login: LoginResponse = serde_json::from_str(&body)?;
        let token = login.token.filter(|t| !t.is_empty()).ok_or_else(|| {
            ClientError::Unauthorized(format!("Login failed for user {}: no token issued", user))
        })?;
        let user_name = login.user_id.unwrap_or_else(|| user.to_string());
        info!(user = %user_name, "Logged in");

        Ok(AuthToken::new(token, user_name))
    }
}

fn is_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Pull a human-readable message out of an auth service error body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("error_msg"))
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub(crate) fn excerpt(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
