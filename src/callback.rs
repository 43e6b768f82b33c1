//! OAuth redirect-callback location handling.
//!
//! After a provider flow the identity backend redirects the client to its
//! callback route with `token` and a URL-encoded JSON `user` as query
//! parameters. These helpers are pure so the parsing rules stay testable
//! apart from the session state machine: detect the callback context, pull
//! out the two parameters, and produce the cleaned location the host should
//! re-apply with a replace-state navigation.

use reqwest::Url;

/// Placeholder base for resolving relative locations; never echoed back.
const RELATIVE_BASE: &str = "http://relative.invalid";

/// Query parameters carried by an OAuth redirect, percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Bearer token. Empty values are treated as absent.
    pub token: Option<String>,
    /// JSON-encoded user payload, still a raw string at this point.
    pub user: Option<String>,
}

/// Whether `location` is the OAuth callback route.
///
/// Matches on the path only, so tokens or user payloads mentioning the
/// callback path inside query parameters do not trigger callback handling.
#[must_use]
pub fn is_callback_location(location: &str, callback_path: &str) -> bool {
    match to_url(location) {
        Some(url) => url.path().contains(callback_path),
        None => location.split(['?', '#']).next().unwrap_or("").contains(callback_path),
    }
}

/// Extract the `token` and `user` query parameters from `location`.
///
/// Locations that cannot be parsed as a URL yield empty params, which the
/// caller treats the same as an incomplete callback.
#[must_use]
pub fn parse_params(location: &str) -> CallbackParams {
    let Some(url) = to_url(location) else {
        return CallbackParams::default();
    };
    let mut params = CallbackParams::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "token" if !value.is_empty() => params.token = Some(value.into_owned()),
            "user" => params.user = Some(value.into_owned()),
            _ => {}
        }
    }
    params
}

/// `location` with its query and fragment removed.
///
/// Relative locations are trimmed textually instead of being resolved, so
/// the caller never receives a placeholder origin it did not pass in.
#[must_use]
pub fn cleaned_location(location: &str) -> String {
    match Url::parse(location) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => location.split(['?', '#']).next().unwrap_or(location).to_string(),
    }
}

fn to_url(location: &str) -> Option<Url> {
    Url::parse(location)
        .ok()
        .or_else(|| Url::parse(RELATIVE_BASE).ok()?.join(location).ok())
}

#[cfg(test)]
#[path = "callback_test.rs"]
mod tests;
