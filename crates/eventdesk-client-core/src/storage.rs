//! Persisted session state.
//!
//! The session is two string entries in a key-value store, mirroring browser
//! `localStorage`: one for the bearer token and one for the role label. Both
//! are written together at login and removed together at logout.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

use crate::auth::Role;

pub const TOKEN_STORAGE_KEY: &str = "token";
pub const ROLE_STORAGE_KEY: &str = "role";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read session file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write session file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("session file {path} is not a JSON object of strings: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode session entries: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("browser storage unavailable: {0}")]
    Unavailable(String),
}

/// Minimal string key-value store, shaped after the web `Storage` interface.
pub trait KeyValueStore {
    type Error: fmt::Display;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error>;
    fn remove_item(&self, key: &str) -> Result<(), Self::Error>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    type Error = S::Error;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        (**self).remove_item(key)
    }
}

/// What the gate sees: the two persisted values, exactly as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub role: Option<String>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(token: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            role: Some(role.into()),
        }
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Fails closed: an absent or unrecognized label matches nothing.
    #[must_use]
    pub fn role_matches(&self, required: Role) -> bool {
        self.role
            .as_deref()
            .is_some_and(|label| required.matches_label(label))
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|label| label.parse().ok())
    }
}

/// Reads both entries. Blank strings count as absent, matching how the API
/// client treats a blank bearer token.
pub fn load_session<S: KeyValueStore>(store: &S) -> Result<SessionSnapshot, S::Error> {
    let token = store
        .get_item(TOKEN_STORAGE_KEY)?
        .filter(|value| !value.trim().is_empty());
    let role = store
        .get_item(ROLE_STORAGE_KEY)?
        .filter(|value| !value.trim().is_empty());
    Ok(SessionSnapshot { token, role })
}

pub fn persist_session<S: KeyValueStore>(
    store: &S,
    token: &str,
    role: &str,
) -> Result<(), S::Error> {
    store.set_item(TOKEN_STORAGE_KEY, token)?;
    if let Err(error) = store.set_item(ROLE_STORAGE_KEY, role) {
        // A token without its role would survive as a half session.
        if let Err(rollback) = store.remove_item(TOKEN_STORAGE_KEY) {
            warn!(error = %rollback, "failed to roll back token after role write failed");
        }
        return Err(error);
    }
    Ok(())
}

/// Removes both entries. The role is removed even if the token removal fails;
/// the first error is returned.
pub fn clear_session<S: KeyValueStore>(store: &S) -> Result<(), S::Error> {
    let token_result = store.remove_item(TOKEN_STORAGE_KEY);
    let role_result = store.remove_item(ROLE_STORAGE_KEY);
    token_result.and(role_result)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(token: &str, role: &str) -> Self {
        let store = Self::new();
        let _ = persist_session(&store, token, role);
        store
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().len(), |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// JSON object of string entries on disk. A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|source| StorageError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        let serialized = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, serialized).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    type Error = StorageError;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserLocalStorage;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{KeyValueStore, StorageError};

    /// `window.localStorage`, resolved on every call.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct BrowserLocalStorage;

    impl BrowserLocalStorage {
        fn storage() -> Result<web_sys::Storage, StorageError> {
            let window = web_sys::window()
                .ok_or_else(|| StorageError::Unavailable("window is unavailable".to_string()))?;
            window
                .local_storage()
                .map_err(|_| StorageError::Unavailable("failed to access local storage".to_string()))?
                .ok_or_else(|| StorageError::Unavailable("local storage is unavailable".to_string()))
        }
    }

    impl KeyValueStore for BrowserLocalStorage {
        type Error = StorageError;

        fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
            Self::storage()?
                .get_item(key)
                .map_err(|_| StorageError::Unavailable(format!("failed to read {key}")))
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
            Self::storage()?
                .set_item(key, value)
                .map_err(|_| StorageError::Unavailable(format!("failed to persist {key}")))
        }

        fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
            Self::storage()?
                .remove_item(key)
                .map_err(|_| StorageError::Unavailable(format!("failed to remove {key}")))
        }
    }
}
