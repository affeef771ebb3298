//! Durable visitor-local storage backends for the cart.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tower_sessions::Session;

/// Errors reading or writing cart storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The session store rejected the operation.
    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The storage backend cannot be used.
    #[error("storage unavailable")]
    Unavailable,
}

/// A namespaced string key-value store scoped to one visitor.
pub trait CartStorage: Send + Sync {
    /// Read the value stored under `key`.
    fn load(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Write `value` under `key`, replacing any previous value.
    fn save(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Cart storage backed by the visitor's session.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    session: Session,
}

impl SessionStorage {
    /// Wrap a session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl CartStorage for SessionStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.session.get::<String>(key).await?)
    }

    async fn save(&self, key: &str, value: String) -> Result<(), StorageError> {
        Ok(self.session.insert(key, value).await?)
    }
}

/// In-process storage, shared between clones.
///
/// `MemoryStorage::unavailable()` builds a store whose every operation fails,
/// which is how a visitor without a working session looks to the cart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
    broken: bool,
}

impl MemoryStorage {
    /// Empty, working storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects every operation.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    /// Raw value under `key`, for inspection.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Store a raw value, bypassing the cart.
    pub fn put(&self, key: &str, value: impl Into<String>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.into());
        }
    }
}

impl CartStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.broken {
            return Err(StorageError::Unavailable);
        }
        let entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        Ok(entries.get(key).cloned())
    }

    async fn save(&self, key: &str, value: String) -> Result<(), StorageError> {
        if self.broken {
            return Err(StorageError::Unavailable);
        }
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}
