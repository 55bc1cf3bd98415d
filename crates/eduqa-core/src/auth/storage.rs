//! Persisted session state: the access token and the user snapshot.
//!
//! Both entries live under fixed keys in a key/value backend and are written
//! and cleared together.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::User;

/// Key holding the bearer token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the serialized user snapshot.
pub const USER_DATA_KEY: &str = "auth_user";

/// Key used by older releases for the token; removed on startup.
pub const LEGACY_TOKEN_KEY: &str = "token";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Keychain access failed for {key}: {source}")]
    Keyring {
        key: String,
        #[source]
        source: keyring::Error,
    },

    #[error("Stored value for {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A string key/value backend.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One file per key under a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn io(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
        move |source| StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(path).map(Some).map_err(Self::io(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(Self::io(key))?;
        std::fs::write(self.path(key), value).map_err(Self::io(key))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key);
        if path.exists() {
            std::fs::remove_file(path).map_err(Self::io(key))?;
        }
        Ok(())
    }
}

/// In-process backend; nothing survives the process.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// Write-through mirror of the session's credentials.
#[derive(Clone)]
pub struct SessionPersistence {
    storage: Arc<dyn LocalStorage>,
}

impl SessionPersistence {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Drop the token key older releases wrote.
    pub fn remove_legacy(&self) {
        if let Err(e) = self.storage.remove(LEGACY_TOKEN_KEY) {
            debug!(error = %e, "Failed to remove legacy token");
        }
    }

    pub fn token(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .storage
            .get(ACCESS_TOKEN_KEY)?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    /// Cached user snapshot. A corrupt snapshot is reported and treated as absent.
    pub fn user(&self) -> Option<User> {
        let raw = match self.storage.get(USER_DATA_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored user");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(source) => {
                let e = StorageError::Corrupt {
                    key: USER_DATA_KEY.to_string(),
                    source,
                };
                warn!(error = %e, "Ignoring stored user");
                None
            }
        }
    }

    /// Persist both entries after a credential change.
    pub fn save(&self, token: &str, user: &User) -> Result<(), StorageError> {
        self.storage.set(ACCESS_TOKEN_KEY, token)?;
        self.save_user(user)
    }

    /// Refresh the snapshot only; the token never goes into it.
    pub fn save_user(&self, user: &User) -> Result<(), StorageError> {
        let json = serde_json::to_string(&user.without_token()).map_err(|source| StorageError::Corrupt {
            key: USER_DATA_KEY.to_string(),
            source,
        })?;
        self.storage.set(USER_DATA_KEY, &json)
    }

    /// Remove every persisted credential entry. Every key is attempted; the
    /// first failure is returned.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut first_err = None;
        for key in [ACCESS_TOKEN_KEY, USER_DATA_KEY, LEGACY_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                debug!(key, error = %e, "Failed to remove persisted entry");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// `clear` for paths that cannot report failure.
    pub fn clear_logged(&self) {
        if let Err(e) = self.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
    }

    pub fn has_token(&self) -> bool {
        matches!(self.token(), Ok(Some(_)))
    }
}
