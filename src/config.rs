//! Session manager configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_CALLBACK_PATH: &str = "/auth/success";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Configuration for a [`crate::SessionManager`].
///
/// All fields have working defaults pointing at the local dev backend, so
/// `AuthConfig::default()` is enough for development and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Identity backend base URL, without a trailing slash.
    pub api_base_url: String,
    /// Path fragment identifying the OAuth callback route on the client.
    pub callback_path: String,
    /// Where to persist the bearer token. `None` keeps it in memory only.
    pub token_path: Option<PathBuf>,
    pub timeouts: AuthTimeouts,
    /// Confirm OAuth callback identities via the backend instead of trusting
    /// the user payload embedded in the redirect URL. Off by default for
    /// compatibility with the original flow; recommended on.
    pub verify_callback_user: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            token_path: None,
            timeouts: AuthTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            verify_callback_user: false,
        }
    }
}

impl AuthConfig {
    /// Build config from environment variables, all optional:
    ///
    /// - `STOREFRONT_API_URL`: identity backend base URL (default local dev)
    /// - `STOREFRONT_AUTH_CALLBACK_PATH`: OAuth callback route fragment
    /// - `STOREFRONT_TOKEN_PATH`: token file location (unset = memory only)
    /// - `STOREFRONT_REQUEST_TIMEOUT_SECS`: default 10
    /// - `STOREFRONT_CONNECT_TIMEOUT_SECS`: default 5
    /// - `STOREFRONT_VERIFY_CALLBACK_USER`: default false
    ///
    /// Unparseable values fall back to their defaults rather than erroring,
    /// since every field has a safe one.
    #[must_use]
    pub fn from_env() -> Self {
        let api_base_url = std::env::var("STOREFRONT_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let callback_path = std::env::var("STOREFRONT_AUTH_CALLBACK_PATH")
            .unwrap_or_else(|_| DEFAULT_CALLBACK_PATH.to_string());
        let token_path = std::env::var("STOREFRONT_TOKEN_PATH")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from);
        let timeouts = AuthTimeouts {
            request_secs: env_parse_u64("STOREFRONT_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("STOREFRONT_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let verify_callback_user = env_bool("STOREFRONT_VERIFY_CALLBACK_USER").unwrap_or(false);

        Self { api_base_url, callback_path, token_path, timeouts, verify_callback_user }
    }

    /// Authorize URL for an OAuth provider, e.g. `{base}/auth/google`.
    #[must_use]
    pub fn oauth_start_url(&self, provider_slug: &str) -> String {
        format!("{}/auth/{provider_slug}", self.api_base_url)
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
