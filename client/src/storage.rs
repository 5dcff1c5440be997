//! Key-value persistence for client-side state.
//!
//! The display-name override table and the seen-announcement list live here.
//! Both are advisory UI state; nothing stored here carries authority.

use crate::error::{EvsdError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Minimal string key-value store
pub trait KeyValueStore {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: String) -> Result<()>;
}

/// Volatile in-process store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store persisting every key into a single JSON object file.
///
/// The whole file is rewritten on each `set`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries if the file exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        debug!("Opened store {:?} with {} keys", path, entries.len());
        Ok(Self { path, entries })
    }

    /// Backing file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}

/// Handle sharing one store between several owners.
///
/// Each `set` is a single locked read-modify-write on the inner store, so
/// two components writing different keys never lose each other's updates.
#[derive(Debug, Default)]
pub struct SharedStore<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> SharedStore<S> {
    /// Wrap `store` for sharing
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }
}

impl<S> Clone for SharedStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: KeyValueStore> KeyValueStore for SharedStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let store = self
            .inner
            .lock()
            .map_err(|e| EvsdError::Storage(e.to_string()))?;
        store.get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        let mut store = self
            .inner
            .lock()
            .map_err(|e| EvsdError::Storage(e.to_string()))?;
        store.set(key, value)
    }
}
