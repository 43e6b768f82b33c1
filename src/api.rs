//! Identity backend client.
//!
//! The backend is a thin proxy in front of a headless CMS: it exchanges
//! credentials for `{token, user}` envelopes and resolves bearer tokens back
//! to users. This module owns the wire shapes and the HTTP plumbing;
//! [`IdentityApi`] is the seam the session manager depends on so tests can
//! substitute a scripted backend.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AuthTimeouts;
use crate::user::UserDto;

/// Message used for HTTP 426 responses, matching the storefront's copy for
/// proxy-level protocol rejections.
const PROTOCOL_ERROR_MESSAGE: &str = "Protocol error. Please try again.";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by identity backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// The request never completed (connect failure, timeout, broken body).
    #[error("request failed: {0}")]
    Transport(String),

    /// A success response carried a body that could not be deserialized.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl ApiError {
    /// Message suitable for direct user display. Backend-provided text is
    /// passed through untouched; other variants render their display form.
    #[must_use]
    pub fn into_message(self) -> String {
        match self {
            ApiError::Backend { message, .. } => message,
            other => other.to_string(),
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Token-and-user envelope returned by login and register.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthGrant {
    /// Opaque bearer token for subsequent requests.
    pub token: String,
    /// The account the token belongs to.
    pub user: UserDto,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct MeEnvelope {
    user: UserDto,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

// =============================================================================
// TRAIT
// =============================================================================

/// Identity backend operations the session manager depends on. Enables
/// mocking in tests.
#[async_trait::async_trait]
pub trait IdentityApi: Send + Sync {
    /// Exchange credentials for a token and user.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the backend rejects the credentials, the
    /// request fails in transit, or the response cannot be decoded.
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError>;

    /// Create an account. The backend issues a token in the same response,
    /// so no follow-up login is needed.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when registration is rejected (e.g. duplicate
    /// email) or the request fails.
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthGrant, ApiError>;

    /// Resolve the user a bearer token belongs to.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the backend no longer honors the token
    /// or the request fails.
    async fn current_user(&self, token: &str) -> Result<UserDto, ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// `reqwest`-backed [`IdentityApi`] speaking the storefront backend routes.
pub struct HttpIdentityApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpIdentityApi {
    /// Build a client for the backend at `base_url` (e.g.
    /// `http://localhost:5000/api`; a trailing slash is tolerated).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>, timeouts: AuthTimeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait::async_trait]
impl IdentityApi for HttpIdentityApi {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError> {
        let response = self
            .http
            .post(self.endpoint("/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        read_json(response).await
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthGrant, ApiError> {
        let response = self
            .http
            .post(self.endpoint("/auth/register"))
            .json(&RegisterRequest { name, email, password })
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        read_json(response).await
    }

    async fn current_user(&self, token: &str) -> Result<UserDto, ApiError> {
        let response = self
            .http
            .get(self.endpoint("/auth/me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let envelope: MeEnvelope = read_json(response).await?;
        Ok(envelope.user)
    }
}

// =============================================================================
// RESPONSE HANDLING
// =============================================================================

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    if !(200..300).contains(&status) {
        return Err(ApiError::Backend { status, message: failure_message(status, &text) });
    }

    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Extract the user-facing message from a failure body.
///
/// The backend reports failures as `{"error": "..."}`; anything else (proxy
/// errors, HTML pages) collapses to a generic status message. The exact
/// generic wording is load-bearing: existing UI copy matches on it.
fn failure_message(status: u16, body: &str) -> String {
    if status == 426 {
        return PROTOCOL_ERROR_MESSAGE.to_string();
    }
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {status}"))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
