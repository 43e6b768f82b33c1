//! Session state machine: the single source of truth for who is logged in.
//!
//! ARCHITECTURE
//! ============
//! Three mutually-exclusive entry paths feed one state slot: credential
//! login/signup, the OAuth redirect callback, and stored-token rehydration at
//! startup. State lives in a `watch` channel so the host application reads
//! snapshots and subscribes to transitions; every mutation publishes a whole
//! new [`Session`] at once.
//!
//! TRADE-OFFS
//! ==========
//! A single commit lock serializes the store-write + snapshot-publish pair of
//! every mutation. That makes overlapping operations last-write-wins and
//! keeps the persisted token consistent with the published snapshot, at the
//! cost of serializing logins nobody issues concurrently in practice.
//!
//! ERROR HANDLING
//! ==============
//! Attended operations (login, signup) reject with a displayable message and
//! leave state untouched. Unattended startup paths never fail outward: they
//! degrade to `Unauthenticated`, log a diagnostic, and purge tokens the
//! backend no longer honors.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::api::{ApiError, AuthGrant, HttpIdentityApi, IdentityApi};
use crate::callback;
use crate::config::AuthConfig;
use crate::store::{FileTokenStore, MemoryTokenStore, TokenStore};
use crate::user::{User, UserDto};

// =============================================================================
// ERROR
// =============================================================================

/// Errors surfaced to session consumers. All are recoverable: show the
/// message, let the user retry.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Login was rejected or could not complete. Displays as the backend's
    /// own message so UIs can show it verbatim.
    #[error("{0}")]
    InvalidCredentials(String),

    /// Signup was rejected (e.g. duplicate email).
    #[error("{0}")]
    RegistrationFailed(String),

    /// A held token is no longer honored by the backend.
    #[error("session is no longer valid: {0}")]
    InvalidSession(String),

    /// The OAuth redirect arrived without its required parameters.
    #[error("incomplete OAuth callback: {0}")]
    MalformedCallback(String),

    /// Persistent token storage failed during an attended operation.
    #[error("token storage failed: {0}")]
    Storage(String),
}

// =============================================================================
// STATE MODEL
// =============================================================================

/// Authentication lifecycle phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// Startup resolution has not finished; `user` is not meaningful yet and
    /// hosts should hold off on auth-dependent redirects.
    #[default]
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// Immutable snapshot of the session state.
///
/// `user` is set iff `token` is set and the backend accepted it (or it was
/// decoded from an OAuth callback payload); `Authenticated` is never
/// published with `user` unset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    /// Opaque bearer credential, present while authenticated.
    pub token: Option<String>,
    /// The signed-in user, present while authenticated.
    pub user: Option<User>,
    pub status: SessionStatus,
}

impl Session {
    #[must_use]
    pub fn authenticated(token: String, user: User) -> Self {
        Self { token: Some(token), user: Some(user), status: SessionStatus::Authenticated }
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self { token: None, user: None, status: SessionStatus::Unauthenticated }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// Outcome of the one-time startup resolution.
#[derive(Debug)]
pub struct StartupResolution {
    /// Session state after resolution.
    pub session: Session,
    /// Location the host should re-apply with a replace-state navigation;
    /// present when OAuth parameters were stripped from a callback URL.
    pub cleaned_location: Option<String>,
    /// Diagnostic for a degraded OAuth callback, for optional display.
    /// Unattended rehydration failures stay log-only and leave this `None`.
    pub error: Option<AuthError>,
}

/// OAuth providers the storefront offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Facebook,
}

impl OAuthProvider {
    /// Path segment the backend mounts the provider flow under.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Facebook => "facebook",
        }
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Owns the authenticated-user state for a running client.
///
/// One instance lives at the application's composition root; everything else
/// reads through [`SessionManager::current`] or subscribes to transitions.
pub struct SessionManager {
    api: Arc<dyn IdentityApi>,
    store: Arc<dyn TokenStore>,
    config: AuthConfig,
    sessions: watch::Sender<Session>,
    /// Serializes every store-write + snapshot-publish pair and carries the
    /// startup-once flag.
    commit: Mutex<CommitState>,
}

#[derive(Default)]
struct CommitState {
    startup_done: bool,
}

impl SessionManager {
    /// Build a manager with injected collaborators.
    #[must_use]
    pub fn new(api: Arc<dyn IdentityApi>, store: Arc<dyn TokenStore>, config: AuthConfig) -> Self {
        let (sessions, _) = watch::channel(Session::default());
        Self { api, store, config, sessions, commit: Mutex::new(CommitState::default()) }
    }

    /// Build a manager from config: HTTP identity client plus a file-backed
    /// token slot when `token_path` is set, memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the HTTP client cannot be
    /// constructed.
    pub fn from_config(config: AuthConfig) -> Result<Self, ApiError> {
        let api = HttpIdentityApi::new(config.api_base_url.clone(), config.timeouts)?;
        let store: Arc<dyn TokenStore> = match &config.token_path {
            Some(path) => Arc::new(FileTokenStore::new(path.clone())),
            None => Arc::new(MemoryTokenStore::new()),
        };
        Ok(Self::new(Arc::new(api), store, config))
    }

    /// Current session snapshot.
    #[must_use]
    pub fn current(&self) -> Session {
        self.sessions.borrow().clone()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.sessions.borrow().status
    }

    /// Receiver observing every session transition; the current snapshot is
    /// readable immediately.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.sessions.subscribe()
    }

    // =========================================================================
    // ATTENDED OPERATIONS
    // =========================================================================

    /// Exchange credentials for an authenticated session.
    ///
    /// On success the token is persisted before the snapshot is published,
    /// so a reload racing this call rehydrates the new session. On failure
    /// the previous session state is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] with the backend's message
    /// (or the transport failure) and [`AuthError::Storage`] if the token
    /// could not be persisted.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials("Email and password are required".into()));
        }
        let grant = self
            .api
            .login(email, password)
            .await
            .map_err(|e| AuthError::InvalidCredentials(e.into_message()))?;
        let user = self.commit_grant(grant).await?;
        tracing::debug!(user_id = %user.id, "login committed");
        Ok(user)
    }

    /// Create an account and sign it in; the backend issues the token in the
    /// registration response, so no follow-up login happens.
    ///
    /// Password strength and confirmation matching are the caller's concern;
    /// only non-emptiness is checked here.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RegistrationFailed`] with the backend's message
    /// and [`AuthError::Storage`] if the token could not be persisted.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::RegistrationFailed("Name, email, and password are required".into()));
        }
        let grant = self
            .api
            .register(name, email, password)
            .await
            .map_err(|e| AuthError::RegistrationFailed(e.into_message()))?;
        let user = self.commit_grant(grant).await?;
        tracing::debug!(user_id = %user.id, "signup committed");
        Ok(user)
    }

    /// Drop the session: clear the stored token and publish a logged-out
    /// snapshot. Idempotent; no backend call involved since the tokens are
    /// stateless.
    pub async fn logout(&self) {
        let _guard = self.commit.lock().await;
        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "failed to clear stored token on logout");
        }
        self.sessions.send_replace(Session::unauthenticated());
    }

    /// Begin an OAuth flow: forget any stored token, then hand back the
    /// provider's authorize URL for the host to navigate to. The redirect
    /// leaves this process, so the in-memory session stays as-is.
    pub async fn start_oauth(&self, provider: OAuthProvider) -> String {
        let _guard = self.commit.lock().await;
        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, provider = provider.slug(), "failed to clear stored token before OAuth start");
        }
        self.config.oauth_start_url(provider.slug())
    }

    // =========================================================================
    // STARTUP RESOLUTION
    // =========================================================================

    /// One-time startup resolution: OAuth callback handling when `location`
    /// is the callback route, stored-token rehydration otherwise.
    ///
    /// Runs exactly once per manager; later calls return the current
    /// snapshot unchanged. Never fails outward — every degradation lands in
    /// `Unauthenticated` with a logged diagnostic, because this runs
    /// unattended during page load.
    pub async fn resolve_startup(&self, location: &str) -> StartupResolution {
        // The guard stays held through resolution so attended operations
        // queue behind startup instead of interleaving with its writes.
        let mut commit = self.commit.lock().await;
        if commit.startup_done {
            tracing::warn!("startup resolution invoked more than once; ignoring");
            return StartupResolution { session: self.current(), cleaned_location: None, error: None };
        }
        commit.startup_done = true;

        if callback::is_callback_location(location, &self.config.callback_path) {
            self.resolve_oauth_callback(location).await
        } else {
            self.rehydrate().await
        }
    }

    /// Non-OAuth startup path. Caller holds the commit lock.
    async fn rehydrate(&self) -> StartupResolution {
        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "token load failed during rehydration");
                None
            }
        };
        let Some(token) = stored else {
            return self.conclude_startup(Session::unauthenticated(), None, None);
        };

        match self.fetch_user(&token).await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "session rehydrated from stored token");
                self.conclude_startup(Session::authenticated(token, user), None, None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored token no longer valid; purging");
                self.clear_store_logged().await;
                self.conclude_startup(Session::unauthenticated(), None, None)
            }
        }
    }

    /// OAuth callback startup path. Caller holds the commit lock.
    async fn resolve_oauth_callback(&self, location: &str) -> StartupResolution {
        // Strip the one-time parameters regardless of outcome so a reload
        // rehydrates instead of replaying the callback.
        let cleaned = Some(callback::cleaned_location(location));
        let params = callback::parse_params(location);

        let Some(token) = params.token else {
            tracing::warn!("OAuth callback missing token parameter");
            let error = AuthError::MalformedCallback("missing token parameter".into());
            return self.conclude_startup(Session::unauthenticated(), cleaned, Some(error));
        };

        // Token before user, same ordering as attended commits. This path
        // must not fail outward, so a broken store only degrades durability.
        if let Err(e) = self.store.save(&token).await {
            tracing::warn!(error = %e, "failed to persist OAuth token; session continues in memory");
        }

        let optimistic = if self.config.verify_callback_user {
            None
        } else {
            params.user.as_deref().and_then(decode_user_param)
        };

        if let Some(user) = optimistic {
            tracing::debug!(user_id = %user.id, "OAuth callback resolved from embedded payload");
            return self.conclude_startup(Session::authenticated(token, user), cleaned, None);
        }

        // No usable embedded payload (absent, unparsable, or verification
        // required): confirm the token with the backend.
        match self.fetch_user(&token).await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "OAuth callback confirmed via token fetch");
                self.conclude_startup(Session::authenticated(token, user), cleaned, None)
            }
            Err(error) => {
                tracing::warn!(error = %error, "OAuth token rejected during callback resolution");
                self.clear_store_logged().await;
                self.conclude_startup(Session::unauthenticated(), cleaned, Some(error))
            }
        }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Resolve `token` to a user via the backend, mapping every failure to
    /// [`AuthError::InvalidSession`] so callers treat the token as dead.
    async fn fetch_user(&self, token: &str) -> Result<User, AuthError> {
        let dto = self
            .api
            .current_user(token)
            .await
            .map_err(|e| AuthError::InvalidSession(e.into_message()))?;
        Ok(User::from(dto))
    }

    /// Persist the token, then publish the authenticated snapshot, both
    /// under the commit lock.
    async fn commit_grant(&self, grant: AuthGrant) -> Result<User, AuthError> {
        let user = User::from(grant.user);
        let _guard = self.commit.lock().await;
        self.store
            .save(&grant.token)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        self.sessions.send_replace(Session::authenticated(grant.token, user.clone()));
        Ok(user)
    }

    /// Publish the startup outcome. Caller holds the commit lock.
    fn conclude_startup(
        &self,
        session: Session,
        cleaned_location: Option<String>,
        error: Option<AuthError>,
    ) -> StartupResolution {
        self.sessions.send_replace(session.clone());
        StartupResolution { session, cleaned_location, error }
    }

    async fn clear_store_logged(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "failed to clear stored token");
        }
    }
}

fn decode_user_param(raw: &str) -> Option<User> {
    match serde_json::from_str::<UserDto>(raw) {
        Ok(dto) => Some(User::from(dto)),
        Err(e) => {
            tracing::warn!(error = %e, "OAuth user payload unparsable; falling back to token fetch");
            None
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
