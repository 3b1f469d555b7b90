//! Durable local key stores.
//!
//! A `KeyStore` persists the encoded note key per account on this device only.
//! Nothing in this module talks to the network.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::{NotesError, Result};
use crate::fs::write_private;

/// Client-local key-value store holding one encoded key per account.
pub trait KeyStore: Send + Sync {
    /// Read the stored key for `account`, if any.
    fn load(&self, account: &str) -> Result<Option<String>>;

    /// Store (or replace) the key for `account`.
    fn save(&self, account: &str, encoded_key: &str) -> Result<()>;

    /// Remove the key for `account`. Removing a missing key is not an error.
    fn clear(&self, account: &str) -> Result<()>;
}

/// Process-memory store, for tests and short-lived embedders.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self, account: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(account).cloned())
    }

    fn save(&self, account: &str, encoded_key: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(account.to_string(), encoded_key.to_string());
        Ok(())
    }

    fn clear(&self, account: &str) -> Result<()> {
        self.entries.lock().remove(account);
        Ok(())
    }
}

/// JSON file store (`{ "<account>": "<base64 key>" }`), written atomically
/// with owner-only permissions.
#[derive(Debug)]
pub struct FileKeyStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                NotesError::KeyStore(format!(
                    "Failed to parse key file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(NotesError::KeyStore(format!(
                "Failed to read key file {}: {}",
                self.path.display(),
                err
            ))),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            return match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            };
        }
        let contents = serde_json::to_vec_pretty(entries)?;
        write_private(&self.path, &contents).map_err(|e| {
            NotesError::KeyStore(format!(
                "Failed to write key file {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self, account: &str) -> Result<Option<String>> {
        let _guard = self.guard.lock();
        Ok(self.read_all()?.remove(account))
    }

    fn save(&self, account: &str, encoded_key: &str) -> Result<()> {
        let _guard = self.guard.lock();
        let mut entries = self.read_all()?;
        entries.insert(account.to_string(), encoded_key.to_string());
        self.write_all(&entries)
    }

    fn clear(&self, account: &str) -> Result<()> {
        let _guard = self.guard.lock();
        let mut entries = self.read_all()?;
        if entries.remove(account).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryKeyStore::new();
        assert_eq!(store.load("a").unwrap(), None);
        store.save("a", "key-a").unwrap();
        assert_eq!(store.load("a").unwrap().as_deref(), Some("key-a"));
        store.clear("a").unwrap();
        store.clear("a").unwrap();
        assert_eq!(store.load("a").unwrap(), None);
    }

    #[test]
    fn test_file_store_keys_by_account() {
        let dir = tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("keys.json"));

        store.save("a@example.com", "key-a").unwrap();
        store.save("b@example.com", "key-b").unwrap();

        let reopened = FileKeyStore::new(dir.path().join("keys.json"));
        assert_eq!(reopened.load("a@example.com").unwrap().as_deref(), Some("key-a"));
        assert_eq!(reopened.load("b@example.com").unwrap().as_deref(), Some("key-b"));

        reopened.clear("a@example.com").unwrap();
        assert_eq!(store.load("a@example.com").unwrap(), None);
        assert_eq!(store.load("b@example.com").unwrap().as_deref(), Some("key-b"));
    }

    #[test]
    fn test_file_store_removes_file_when_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.json");
        let store = FileKeyStore::new(&path);

        store.save("a", "key-a").unwrap();
        assert!(path.exists());
        store.clear("a").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileKeyStore::new(&path);
        let err = store.load("a").unwrap_err();
        assert!(matches!(err, NotesError::KeyStore(_)));
    }
}
