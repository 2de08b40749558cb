//! Key/value storage behind the generation cache.
//!
//! Storage is synchronous and string-valued. Implementations may be
//! unavailable (no backing store at all) or reject writes (quota, I/O);
//! callers decide how to degrade.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Errors raised by a [`KeyValueStorage`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No backing store exists in this environment.
    #[error("storage unavailable")]
    Unavailable,

    /// The write would exceed the storage quota.
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        /// Bytes the store would hold after the write.
        needed: usize,
        /// Configured limit.
        quota: usize,
    },

    /// Underlying read or write failed.
    #[error("storage i/o failed: {0}")]
    Io(String),
}

/// String key/value store.
pub trait KeyValueStorage: Send + Sync + fmt::Debug {
    /// Whether the store can be used at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Reads a value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the write is rejected.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a value. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage with an optional byte quota over all values.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Unbounded storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once keys and values exceed `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(bytes),
        }
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Stand-in for environments without any storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStorage;

impl KeyValueStorage for UnavailableStorage {
    fn is_available(&self) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Stores values under `dir`, which is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StorageError::Io(e.to_string()))?;
        std::fs::write(self.path(key), value).map_err(|e| StorageError::Io(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k"), Ok(None));
        assert_eq!(storage.set("k", "v"), Ok(()));
        assert_eq!(storage.get("k"), Ok(Some("v".to_string())));
        assert_eq!(storage.remove("k"), Ok(()));
        assert_eq!(storage.get("k"), Ok(None));
        assert_eq!(storage.remove("k"), Ok(()));
    }

    #[test]
    fn quota_counts_replacement_once() {
        let storage = MemoryStorage::with_quota(10);
        assert_eq!(storage.set("key", "1234567"), Ok(()));
        assert_eq!(storage.set("key", "7654321"), Ok(()));
        assert_eq!(
            storage.set("key", "12345678"),
            Err(StorageError::QuotaExceeded {
                needed: 11,
                quota: 10
            })
        );
        assert_eq!(storage.get("key"), Ok(Some("7654321".to_string())));
    }

    #[test]
    fn unavailable_storage_refuses_everything() {
        let storage = UnavailableStorage;
        assert!(!storage.is_available());
        assert_eq!(storage.get("k"), Err(StorageError::Unavailable));
        assert_eq!(storage.set("k", "v"), Err(StorageError::Unavailable));
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = std::env::temp_dir().join(format!("cta-storage-{}", uuid::Uuid::new_v4()));
        let storage = FileStorage::new(&dir);
        assert_eq!(storage.get("repo-cta-cache"), Ok(None));
        assert_eq!(storage.set("repo-cta-cache", "{}"), Ok(()));
        assert_eq!(storage.get("repo-cta-cache"), Ok(Some("{}".to_string())));
        assert!(dir.join("repo-cta-cache.json").exists());
        assert_eq!(storage.remove("repo-cta-cache"), Ok(()));
        assert_eq!(storage.remove("repo-cta-cache"), Ok(()));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
