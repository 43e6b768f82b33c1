//! User entity and the wire payload it is normalized from.
//!
//! The identity backend fronts a headless CMS, so the user JSON it hands out
//! is looser than what the rest of the client wants to consume: numeric or
//! string ids, optional names, provider tags that may be absent entirely.
//! [`UserDto`] mirrors that wire shape verbatim; [`User`] is the normalized
//! form everything else in the crate works with.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Identity provider an account was created through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Email/password signup, also the fallback for unknown wire values.
    #[default]
    Email,
    Google,
    Facebook,
}

impl Provider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Email => "email",
            Provider::Google => "google",
            Provider::Facebook => "facebook",
        }
    }
}

/// An authenticated storefront user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend-issued identifier, stringified.
    pub id: String,
    /// Provider-scoped identifier when the account came through OAuth,
    /// otherwise the same as `id`.
    pub display_id: String,
    /// Display name.
    pub name: String,
    /// Account email address.
    pub email: String,
    /// Avatar image URL, if available.
    pub avatar_url: Option<String>,
    /// How the account was created.
    pub provider: Provider,
}

/// User payload as the identity backend serializes it.
///
/// Field tolerance matters here: the CMS issues numeric ids while OAuth
/// callback payloads carry strings, and older backend variants attach extra
/// fields (`strapiId`) that are deliberately ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    /// Account identifier; number or string on the wire.
    #[serde(deserialize_with = "deserialize_id_string")]
    pub id: String,
    /// Display name; absent for some CMS-created accounts.
    pub name: Option<String>,
    /// Account email address.
    pub email: String,
    /// Avatar image URL.
    pub avatar: Option<String>,
    /// Provider tag, e.g. `"google"`; absent means email signup.
    pub provider: Option<String>,
    /// Provider-scoped identifier for OAuth accounts.
    #[serde(rename = "providerId")]
    pub provider_id: Option<String>,
}

impl From<UserDto> for User {
    fn from(dto: UserDto) -> Self {
        let provider = provider_from_wire(dto.provider.as_deref());
        let display_id = dto.provider_id.unwrap_or_else(|| dto.id.clone());
        let name = dto
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| name_from_email(&dto.email));
        Self {
            id: dto.id,
            display_id,
            name,
            email: dto.email,
            avatar_url: dto.avatar,
            provider,
        }
    }
}

fn provider_from_wire(raw: Option<&str>) -> Provider {
    match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("google") => Provider::Google,
        Some("facebook") => Provider::Facebook,
        _ => Provider::Email,
    }
}

fn name_from_email(email: &str) -> String {
    let local = email
        .split('@')
        .next()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("user");
    local.to_owned()
}

fn deserialize_id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(D::Error::custom("expected string or number id")),
    }
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
