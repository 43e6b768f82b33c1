//! Persistent storage for the bearer token.
//!
//! The storefront client persists exactly one thing across restarts: the
//! bearer token. [`TokenStore`] abstracts that slot so the session manager
//! can run against process memory in tests and a single file in embedding
//! binaries.

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::sync::RwLock;

/// Error raised by [`TokenStore`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The token file could not be read, written, or removed.
    #[error("token storage io: {0}")]
    Io(#[from] std::io::Error),
}

/// The persistent slot holding the bearer token.
///
/// Only the session manager writes this slot; reads happen at startup
/// rehydration. Implementations must be shareable across tasks.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Read the stored token. `Ok(None)` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the slot exists but cannot be read.
    async fn load(&self) -> Result<Option<String>, StoreError>;

    /// Persist `token`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the token cannot be written durably.
    async fn save(&self, token: &str) -> Result<(), StoreError>;

    /// Remove the stored token. Clearing an empty slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when an existing token cannot be removed.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// In-memory token slot; the default when no token path is configured.
///
/// Sessions held here do not survive a process restart, which matches the
/// incognito-window behavior of the original client.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, token: &str) -> Result<(), StoreError> {
        *self.slot.write().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.slot.write().await = None;
        Ok(())
    }
}

/// File-backed token slot for native embeddings.
///
/// The file holds the raw token and nothing else. Writes go through a
/// sibling temp file and a rename so a crash mid-write cannot leave a
/// truncated token behind.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let token = raw.trim().to_string();
                Ok(if token.is_empty() { None } else { Some(token) })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, token: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, token).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
