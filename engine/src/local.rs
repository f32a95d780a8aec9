//! Local store - durable key-value storage for collections.
//!
//! The local store is the source of truth for what the UI shows right now.
//! Each key holds a JSON array of [`SyncRecord`]s. Writes land here before
//! any remote call is attempted.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::collection::validate_collection_key;
use crate::{error::Result, Error, SyncRecord};

/// Synchronous key-value storage surviving restarts.
///
/// Implementations fail only on serialization errors or resource exhaustion.
pub trait LocalStore: Send + Sync {
    /// Read the value under `key`, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// In-memory local store. Values are held serialized, the same way a
/// browser's storage would hold them.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw string under a key, bypassing serialization.
    pub fn set_raw(&self, key: &str, raw: impl Into<String>) {
        self.entries.lock().insert(key.to_string(), raw.into());
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.lock();
        match entries.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let raw = serde_json::to_string(&value)?;
        self.entries.lock().insert(key.to_string(), raw);
        Ok(())
    }
}

/// File-backed local store: one `<key>.json` file per key in a directory.
///
/// Writes go to a randomly named temp file in the same directory, are synced
/// to disk and then renamed over the collection file. The directory is
/// synced after the rename on Unix.
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    root: PathBuf,
}

impl FileLocalStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "Opened file local store");
        Ok(Self { root })
    }

    /// Directory holding the collection files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_collection_key(key)?;
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let path = self.path_for(key)?;
        let raw = serde_json::to_vec(&value)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.as_file_mut().write_all(&raw)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        #[cfg(unix)]
        fs::File::open(&self.root)?.sync_all()?;
        Ok(())
    }
}

/// Typed view of the local store as collections of records.
///
/// Every read-modify-write runs under one write lock, so two saves into the
/// same collection cannot drop each other's records. The lock is never held
/// across an `.await`.
pub struct LocalCollections {
    store: Arc<dyn LocalStore>,
    write_lock: Mutex<()>,
}

impl LocalCollections {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// The underlying key-value store.
    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    /// Read a collection. Absent or corrupt data reads as empty.
    pub fn read(&self, key: &str) -> Result<Vec<SyncRecord>> {
        match self.store.get(key) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(records) => Ok(records),
                Err(e) => {
                    tracing::warn!(collection = %key, error = %e, "Discarding malformed local collection");
                    Ok(Vec::new())
                }
            },
            Ok(None) => Ok(Vec::new()),
            Err(Error::Serialization(e)) => {
                tracing::warn!(collection = %key, error = %e, "Discarding unreadable local collection");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Overwrite a collection.
    pub fn write(&self, key: &str, records: &[SyncRecord]) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.persist(key, records)
    }

    /// Atomically transform a collection and persist the result.
    pub fn update<T>(&self, key: &str, f: impl FnOnce(&mut Vec<SyncRecord>) -> T) -> Result<T> {
        let _guard = self.write_lock.lock();
        let mut records = self.read(key)?;
        let out = f(&mut records);
        self.persist(key, &records)?;
        Ok(out)
    }

    /// Append a record to a collection.
    pub fn append(&self, key: &str, record: SyncRecord) -> Result<()> {
        self.update(key, |records| records.push(record))
    }

    /// Replace a placeholder id with its confirmed id.
    ///
    /// Returns false if no record with `temp_id` is present any more.
    pub fn confirm(&self, key: &str, temp_id: &str, remote_id: &str) -> Result<bool> {
        self.update(key, |records| {
            match records.iter_mut().find(|r| r.id == temp_id) {
                Some(record) => {
                    record.confirm(remote_id);
                    true
                }
                None => false,
            }
        })
    }

    fn persist(&self, key: &str, records: &[SyncRecord]) -> Result<()> {
        let value = serde_json::to_value(records)?;
        self.store.set(key, value)
    }
}
