//! In-process remote store with a reachability switch.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{apply_patch, RemoteStore};
use crate::{error::RemoteResult, RecordId, RemoteError, SyncRecord};

/// Remote store held in memory.
///
/// Documents are listed newest first, like the HTTP server. Flipping
/// [`set_reachable`](Self::set_reachable) makes every call fail with
/// [`RemoteError::Unreachable`], which is how tests and demos simulate
/// going offline.
#[derive(Debug)]
pub struct MemoryRemoteStore {
    collections: DashMap<String, Vec<SyncRecord>>,
    reachable: AtomicBool,
    add_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            reachable: AtomicBool::new(true),
            add_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Make the store reachable or unreachable.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Seed a document directly, bypassing reachability.
    pub fn insert(&self, collection: &str, record: SyncRecord) {
        let mut record = record;
        record.needs_sync = false;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(0, record);
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |c| c.len())
    }

    /// Check if a collection has no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// How many `add` calls were made, including failed ones.
    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    /// How many `list` calls were made, including failed ones.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> RemoteResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Unreachable("memory store switched off".to_string()))
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn add(&self, collection: &str, data: Value) -> RemoteResult<RecordId> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        let mut fields = serde_json::Map::new();
        apply_patch(&mut fields, data)?;

        let id = uuid::Uuid::new_v4().to_string();
        self.insert(collection, SyncRecord::confirmed(id.clone(), fields));
        Ok(id)
    }

    async fn list(&self, collection: &str) -> RemoteResult<Vec<SyncRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        Ok(self
            .collections
            .get(collection)
            .map(|c| c.value().clone())
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> RemoteResult<SyncRecord> {
        self.check_reachable()?;

        self.collections
            .get(collection)
            .and_then(|c| c.iter().find(|r| r.id == id).cloned())
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> RemoteResult<()> {
        self.check_reachable()?;

        let mut docs = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        let record = docs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        apply_patch(&mut record.fields, patch)
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<()> {
        self.check_reachable()?;

        let mut docs = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        let before = docs.len();
        docs.retain(|r| r.id != id);
        if docs.len() == before {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn ping(&self) -> RemoteResult<()> {
        self.check_reachable()
    }
}
