//! # storefront-session
//!
//! Client-side authentication session manager for the art-school storefront.
//! Owns the "who is logged in" state for a running client: credential login
//! and signup, OAuth redirect-callback handling, bearer-token persistence
//! and rehydration, and logout.
//!
//! The embedding application constructs one [`SessionManager`] at its
//! composition root, calls [`SessionManager::resolve_startup`] once with the
//! startup location, and reads or subscribes to [`Session`] snapshots from
//! then on. The identity backend and the token store sit behind traits
//! ([`IdentityApi`], [`TokenStore`]) so tests and alternative hosts can
//! substitute them.

pub mod api;
pub mod callback;
pub mod config;
pub mod session;
pub mod store;
pub mod user;

pub use api::{ApiError, AuthGrant, HttpIdentityApi, IdentityApi};
pub use config::{AuthConfig, AuthTimeouts};
pub use session::{
    AuthError, OAuthProvider, Session, SessionManager, SessionStatus, StartupResolution,
};
pub use store::{FileTokenStore, MemoryTokenStore, StoreError, TokenStore};
pub use user::{Provider, User, UserDto};
