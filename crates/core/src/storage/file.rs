//! JSON-file storage.
//!
//! All keys live in one JSON document:
//!
//! ```json
//! { "version": 1, "values": { "stock-app-watchlist": "[\"AAPL\"]" } }
//! ```
//!
//! The file is created on first write; parent directories are created on
//! demand. Writes go to a temp file in the same directory and are renamed
//! over the target. A document that fails to parse is replaced on the next
//! write.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::KeyValueStore;
use crate::errors::{Error, Result, StorageError};

const CURRENT_VERSION: u32 = 1;

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

#[derive(Serialize, Deserialize, Default)]
struct StoredValues {
    version: u32,
    values: HashMap<String, String>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_store<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self.lock.lock().map_err(|_| StorageError::LockPoisoned)?;
        let mut store = match self.load_store_locked() {
            Ok(store) => store,
            Err(Error::Storage(StorageError::Serialization(e))) => {
                warn!(
                    "Overwriting unreadable storage file {}: {}",
                    self.path.display(),
                    e
                );
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        op(&mut store);
        self.persist_store_locked(store)
    }

    fn read_store(&self) -> Result<HashMap<String, String>> {
        let _guard = self.lock.lock().map_err(|_| StorageError::LockPoisoned)?;
        self.load_store_locked()
    }

    fn load_store_locked(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let raw = fs::read(&self.path)?;
        if raw.is_empty() {
            return Ok(HashMap::new());
        }

        let stored: StoredValues = serde_json::from_slice(&raw)?;
        Ok(stored.values)
    }

    fn persist_store_locked(&self, values: HashMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let stored = StoredValues {
            version: CURRENT_VERSION,
            values,
        };
        let json = serde_json::to_vec_pretty(&stored)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!("Wrote storage file {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_store()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_store(|store| {
            store.insert(key.to_string(), value.to_string());
        })
    }
}
