// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable key/value storage backing the token store.
//!
//! Operations are synchronous and infallible from the caller's point of
//! view: a failed file write is logged and the in-memory value still wins.

pub mod cookie;
pub mod token_store;

pub use cookie::CookieMirror;
pub use token_store::{Credential, TokenStore};

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Storage keys as constants.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "auth-token";
    pub const REFRESH_TOKEN: &str = "refresh-token";
    /// Persisted `{ user, token, isAuthenticated }` blob
    pub const SESSION: &str = "auth-storage";
}

/// Minimal synchronous key/value store.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Process-local storage, lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// JSON-file storage that survives process restarts.
///
/// Every mutation rewrites the whole file through a temporary file and a
/// rename, so a crash never leaves a half-written store behind.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: DashMap<String, String>,
    /// Serializes file rewrites.
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A corrupt file is logged and treated as empty; it is overwritten on
    /// the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = DashMap::new();

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(map) => {
                    for (key, value) in map {
                        entries.insert(key, value);
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Token store is corrupt, starting empty");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::Io(e)),
        }

        Ok(Self {
            path,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        if let Err(e) = write_atomic(&self.path, &snapshot) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist token store");
        }
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush();
    }

    fn remove(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.flush();
        }
    }
}

fn write_atomic(path: &Path, snapshot: &BTreeMap<String, String>) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let contents = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
