//! Local key-value storage for the anonymous usage counter
//!
//! The gate never touches a global; it is handed a [`Store`]. [`MemoryStore`]
//! is shared between clones, so two clients built from clones of one store
//! behave like two tabs over the same local storage. [`FileStore`] persists
//! to a JSON object on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use thiserror::Error;

/// Local storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded
    #[error("encode error: {0}")]
    Encode(String),

    /// Store lock poisoned by a panicking writer
    #[error("store lock poisoned")]
    Poisoned,
}

/// String key-value storage
pub trait Store: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Read a usage counter. Missing, negative or unparsable values read as 0.
pub fn read_count<S: Store + ?Sized>(store: &S, key: &str) -> Result<u32, StoreError> {
    Ok(store
        .get(key)?
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .unwrap_or(0))
}

/// Write a usage counter as a decimal string.
pub fn write_count<S: Store + ?Sized>(store: &S, key: &str, count: u32) -> Result<(), StoreError> {
    store.set(key, &count.to_string())
}

/// In-memory store, shared between clones
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a JSON object in a single file.
///
/// A missing or unreadable file is treated as empty; the next write replaces
/// it. Writes go to a sibling temp file and are renamed into place.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (or lazily create) a store at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable store file");
                Ok(BTreeMap::new())
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let encoded =
            serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Encode(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, encoded)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut entries = self.load()?;
        f(&mut entries);
        self.save(&entries)
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_count_missing_is_zero() {
        let store = MemoryStore::new();
        assert_eq!(read_count(&store, "anonymous_tool_usage").unwrap(), 0);
    }

    #[test]
    fn test_read_count_unparsable_is_zero() {
        let store = MemoryStore::new();
        for raw in ["abc", "-2", "1.5", "", "{\"count\":2}"] {
            store.set("k", raw).unwrap();
            assert_eq!(read_count(&store, "k").unwrap(), 0, "value {raw:?}");
        }
    }

    #[test]
    fn test_read_count_tolerates_whitespace() {
        let store = MemoryStore::new();
        store.set("k", " 2\n").unwrap();
        assert_eq!(read_count(&store, "k").unwrap(), 2);
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        write_count(&a, "k", 2).unwrap();
        assert_eq!(read_count(&b, "k").unwrap(), 2);

        b.remove("k").unwrap();
        assert!(a.is_empty());
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let store = FileStore::new(&path);
        write_count(&store, "anonymous_tool_usage", 1).unwrap();
        store.set("theme", "dark").unwrap();

        let reopened = FileStore::new(&path);
        assert_eq!(read_count(&reopened, "anonymous_tool_usage").unwrap(), 1);
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("dark"));

        reopened.remove("theme").unwrap();
        assert_eq!(store.get("theme").unwrap(), None);
    }

    #[test]
    fn test_file_store_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get("anything").unwrap(), None);

        write_count(&store, "k", 3).unwrap();
        assert_eq!(read_count(&store, "k").unwrap(), 3);
    }
}
