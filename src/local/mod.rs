//! Local durable state: small keyed JSON blobs (cart lines, wishlist ids)
//! that live beside the process rather than in the document store.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("invalid key {0:?}")]
    InvalidKey(String),
    #[error("io error on {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to serialize {key}: {source}")]
    Serialize { key: String, #[source] source: serde_json::Error },
}

pub trait LocalStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, LocalStoreError>;
    fn write(&self, key: &str, contents: &str) -> Result<(), LocalStoreError>;
    fn remove(&self, key: &str) -> Result<(), LocalStoreError>;
}

/// Keys may only contain ASCII letters, digits, `_`, `-` and `.`, and must not start with a dot.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && !key.starts_with('.')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// One `<key>.json` file per key inside a directory.
///
/// I/O is synchronous. Values are a single session's cart or wishlist, a few
/// hundred bytes each; loads run on the blocking pool (see `api::Sessions`),
/// writes happen inline on mutation.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LocalStoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| LocalStoreError::Io { path: dir.clone(), source })?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> Result<PathBuf, LocalStoreError> {
        if !is_valid_key(key) { return Err(LocalStoreError::InvalidKey(key.to_string())); }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl LocalStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        let path = self.path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(LocalStoreError::Io { path, source }),
        }
    }

    fn write(&self, key: &str, contents: &str) -> Result<(), LocalStoreError> {
        let path = self.path(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|source| LocalStoreError::Io { path: tmp.clone(), source })?;
        std::fs::rename(&tmp, &path).map_err(|source| LocalStoreError::Io { path, source })
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        let path = self.path(key)?;
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(LocalStoreError::Io { path, source: e }),
            _ => Ok(()),
        }
    }
}

/// Volatile store for tests and ephemeral sessions.
#[derive(Clone, Default)]
pub struct MemoryLocalStore {
    blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self { Self::default() }

    fn blobs(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.blobs.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl LocalStore for MemoryLocalStore {
    fn read(&self, key: &str) -> Result<Option<String>, LocalStoreError> { Ok(self.blobs().get(key).cloned()) }

    fn write(&self, key: &str, contents: &str) -> Result<(), LocalStoreError> {
        self.blobs().insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        self.blobs().remove(key);
        Ok(())
    }
}

/// Reads a JSON array. Missing, unreadable or corrupt content yields an empty list;
/// corrupt content is also discarded from the store.
pub fn load_list<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Vec<T> {
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::error!(key, error = %e, "Error loading local state");
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(key, error = %e, "Discarding corrupt local state");
            if let Err(e) = store.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove corrupt local state");
            }
            Vec::new()
        }
    }
}

/// Rewrites the whole list.
pub fn save_list<T: Serialize>(store: &dyn LocalStore, key: &str, items: &[T]) -> Result<(), LocalStoreError> {
    let raw = serde_json::to_string(items).map_err(|source| LocalStoreError::Serialize { key: key.to_string(), source })?;
    store.write(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("liluxe_cart.abc-123"));
        assert!(!is_valid_key("../etc/passwd"));
        assert!(!is_valid_key(".hidden"));
        assert!(!is_valid_key(""));
    }

    #[test]
    fn test_file_store_round_trip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("state")).unwrap();
        assert_eq!(store.read("liluxe_wishlist").unwrap(), None);
        save_list(&store, "liluxe_wishlist", &["p1", "p2"]).unwrap();
        assert_eq!(load_list::<String>(&store, "liluxe_wishlist"), ["p1", "p2"]);
        store.remove("liluxe_wishlist").unwrap();
        store.remove("liluxe_wishlist").unwrap();
        assert!(load_list::<String>(&store, "liluxe_wishlist").is_empty());
        assert!(matches!(store.write("../x", "[]"), Err(LocalStoreError::InvalidKey(_))));
    }

    #[test]
    fn test_corrupt_content_is_discarded() {
        let store = MemoryLocalStore::new();
        store.write("liluxe_cart", "{not json").unwrap();
        assert!(load_list::<String>(&store, "liluxe_cart").is_empty());
        assert_eq!(store.read("liluxe_cart").unwrap(), None);
    }
}
