// src/storage.rs
//! Local key-value persistence.
//!
//! Values are stored as JSON strings under named keys, the way browser
//! local storage holds them. Every key is read and written independently;
//! there is no transaction spanning keys. Writes are synchronous and
//! write-through: when `set` returns `Ok`, the backend holds the value.

use crate::error::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Keys owned by the stores. Auth owns the token, user and directory keys;
/// the conversation store owns the history keys.
pub mod keys {
    pub const AUTH_TOKEN: &str = "chatbot_auth_token";
    pub const USER_DATA: &str = "chatbot_user_data";
    pub const THEME: &str = "chatbot_theme";
    pub const CHAT_HISTORY: &str = "chatbot_chat_history";
    pub const INPUT_HISTORY: &str = "chatbot_input_history";
    pub const DEMO_USERS: &str = "demo_users";
}

/// Raw string backend behind [`Storage`].
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_raw(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn check_quota<'a, I>(
    entries: I,
    key: &str,
    value: &str,
    quota: Option<usize>,
) -> Result<(), StorageError>
where
    I: Iterator<Item = (&'a String, &'a String)>,
{
    let Some(quota) = quota else {
        return Ok(());
    };

    let others: usize = entries
        .filter(|(k, _)| k.as_str() != key)
        .map(|(k, v)| k.len() + v.len())
        .sum();
    let needed = others + key.len() + value.len();

    if needed > quota {
        return Err(StorageError::QuotaExceeded {
            key: key.to_string(),
            needed,
            quota,
        });
    }
    Ok(())
}

/// Process-local store. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the total size of keys plus values, in bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        check_quota(entries.iter(), key, &value, self.quota)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// The whole map is rewritten on every change through a temporary file and
/// an atomic rename, so a failed write leaves the previous file intact and
/// the in-memory map unchanged.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|source| StorageError::Deserialize {
                    key: path.display().to_string(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "opened file store");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            quota: None,
        })
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(entries).map_err(|source| {
            StorageError::Serialize {
                key: self.path.display().to_string(),
                source,
            }
        })?;

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(content.as_bytes())?;
        tmp_file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        check_quota(entries.iter(), key, &value, self.quota)?;

        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        if !entries.contains_key(key) {
            return Ok(());
        }

        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

/// Typed, cloneable handle shared by every store.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.backend.get_raw(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StorageError::Deserialize {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Reads `key`, falling back to `default` when it is missing or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(key, error = %e, "error reading stored value, using default");
                default
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.backend.set_raw(key, raw)
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.backend.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_default_for_missing_key() {
        let storage = Storage::in_memory();
        let value: Vec<String> = storage.get("missing", vec!["fallback".to_string()]);
        assert_eq!(value, vec!["fallback".to_string()]);
    }

    #[test]
    fn test_set_then_get_and_remove() {
        let storage = Storage::in_memory();
        storage.set("numbers", &vec![1, 2, 3]).unwrap();
        assert_eq!(storage.get::<Vec<i32>>("numbers", vec![]), vec![1, 2, 3]);

        storage.remove("numbers").unwrap();
        assert_eq!(storage.try_get::<Vec<i32>>("numbers").unwrap(), None);
    }

    #[test]
    fn test_unparseable_value_falls_back_to_default() {
        let store = MemoryStore::new();
        store.set_raw("broken", "{not json".to_string()).unwrap();
        let storage = Storage::new(store);

        assert!(storage.try_get::<Vec<String>>("broken").is_err());
        assert_eq!(storage.get::<Vec<String>>("broken", vec![]), Vec::<String>::new());
    }

    #[test]
    fn test_quota_exceeded_keeps_previous_value() {
        let storage = Storage::new(MemoryStore::with_quota(32));
        storage.set("k", "small").unwrap();

        let err = storage.set("k", &"x".repeat(64)).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(storage.get("k", String::new()), "small");
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let storage = Storage::new(FileStore::open(&path).unwrap());
            storage.set(keys::THEME, "dark").unwrap();
            storage.set(keys::INPUT_HISTORY, &vec!["hi"]).unwrap();
            storage.remove(keys::INPUT_HISTORY).unwrap();
        }

        let storage = Storage::new(FileStore::open(&path).unwrap());
        assert_eq!(storage.get(keys::THEME, String::new()), "dark");
        assert_eq!(storage.try_get::<Vec<String>>(keys::INPUT_HISTORY).unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not a map").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(StorageError::Deserialize { .. })
        ));
    }
}
