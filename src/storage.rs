//! Storage layer for taskboard
//!
//! The board persists through a flat key-value string store, the same shape
//! as a browser's local storage: `get`, `set`, `remove`, `clear`, no
//! transactions, no expiry. Keys are opaque strings; values are whatever
//! the caller serialised.
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/                 # --data-dir, $TB_DATA_DIR, or the platform data dir
//!   config.toml               # Optional configuration
//!   store.json                # Key-value map (one JSON object of strings)
//!   store.json.lock           # Advisory lock guarding store.json writes
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use directories::ProjectDirs;

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "TB_DATA_DIR";

const STORE_FILE: &str = "store.json";
const CONFIG_FILE: &str = "config.toml";

/// Minimal key-value contract the board persists through.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;

    /// All keys currently present, sorted.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Resolved on-disk locations for one board
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Pick the data directory: explicit path, then `$TB_DATA_DIR`, then
    /// the platform data directory.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path.to_path_buf()));
        }
        if let Ok(value) = std::env::var(DATA_DIR_ENV) {
            if !value.trim().is_empty() {
                return Ok(Self::new(PathBuf::from(value)));
            }
        }
        let dirs = ProjectDirs::from("", "", "taskboard").ok_or_else(|| {
            Error::OperationFailed(
                "could not determine a data directory; pass --data-dir".to_string(),
            )
        })?;
        Ok(Self::new(dirs.data_dir().to_path_buf()))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn file_store(&self) -> FileStore {
        FileStore::new(self.store_file())
    }
}

/// Key-value store backed by one JSON object on disk.
///
/// Each call re-reads the file under its lock, so several processes
/// sharing a data directory see each other's keys; a `set` on one key never
/// drops another process's keys, but a value written for the same key is
/// replaced wholesale.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    timeout_ms: u64,
}

type KvMap = BTreeMap<String, String>;

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<KvMap> {
        match lock::read_locked(&self.path, self.timeout_ms)? {
            Some(bytes) => decode_map(&bytes),
            None => Ok(KvMap::new()),
        }
    }

    fn modify<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut KvMap) -> bool,
    {
        lock::update_locked(&self.path, self.timeout_ms, |current| {
            let mut recovered = false;
            let mut map = match current.map(|bytes| decode_map(&bytes)) {
                Some(Ok(map)) => map,
                Some(Err(err)) => {
                    // A write replaces an unreadable file instead of failing forever.
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %err,
                        "store file unreadable; starting from an empty map"
                    );
                    recovered = true;
                    KvMap::new()
                }
                None => KvMap::new(),
            };
            let changed = apply(&mut map);
            if !changed && !recovered {
                return Ok(None);
            }
            Ok(Some(serde_json::to_vec_pretty(&map)?))
        })
    }
}

fn decode_map(bytes: &[u8]) -> Result<KvMap> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(KvMap::new());
    }
    Ok(serde_json::from_slice(bytes)?)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.modify(|map| {
            map.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.modify(|map| map.remove(key).is_some())
    }

    fn clear(&self) -> Result<()> {
        self.modify(|map| {
            let had_keys = !map.is_empty();
            map.clear();
            had_keys
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read_map()?.into_keys().collect())
    }
}

/// In-process store. Clones share the same map, which lets a test keep a
/// handle on what the board wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    map: Rc<RefCell<KvMap>>,
    writes: Rc<RefCell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls observed so far
    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        *self.writes.borrow_mut() += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.map.borrow_mut().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.map.borrow_mut().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.map.borrow().keys().cloned().collect())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }
}
