//! Export and import of the locally held collections.
//!
//! A snapshot is a backup of what this device holds, pending records
//! included. Collections are keyed in a BTreeMap so the serialized form is
//! stable.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::validate_collection_key;
use crate::local::LocalCollections;
use crate::{error::Result, CollectionName, Error, SyncCoordinator, SyncRecord};

/// Version of the snapshot format for future compatibility.
pub const LOCAL_SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time copy of local collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSnapshot {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub collections: BTreeMap<CollectionName, Vec<SyncRecord>>,
}

impl LocalSnapshot {
    pub fn new(exported_at: DateTime<Utc>) -> Self {
        Self {
            format_version: LOCAL_SNAPSHOT_FORMAT_VERSION,
            exported_at,
            collections: BTreeMap::new(),
        }
    }

    /// Read the given collections out of local storage.
    pub fn capture<I, S>(local: &LocalCollections, collections: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut snapshot = Self::new(Utc::now());
        for collection in collections {
            let key = collection.as_ref();
            snapshot
                .collections
                .insert(key.to_string(), local.read(key)?);
        }
        Ok(snapshot)
    }

    /// Overwrite local storage with the snapshot's collections.
    ///
    /// Collections not in the snapshot are left untouched. Every key is
    /// validated before anything is written.
    pub fn restore(&self, local: &LocalCollections) -> Result<()> {
        for key in self.collections.keys() {
            validate_collection_key(key)?;
        }
        for (key, records) in &self.collections {
            local.write(key, records)?;
        }
        Ok(())
    }

    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Records still waiting for upload.
    pub fn pending_count(&self) -> usize {
        self.collections
            .values()
            .flatten()
            .filter(|r| r.needs_sync)
            .count()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > LOCAL_SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, LOCAL_SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

impl SyncCoordinator {
    /// Snapshot every configured collection.
    pub fn export_local(&self) -> Result<LocalSnapshot> {
        let snapshot = LocalSnapshot::capture(self.local(), &self.config().collections)?;
        tracing::info!(
            collections = snapshot.collections.len(),
            records = snapshot.record_count(),
            "Exported local collections"
        );
        Ok(snapshot)
    }

    /// Restore a snapshot into local storage.
    ///
    /// `pending_uploads` is reset to the number of pending records held in
    /// the configured collections afterwards, and listeners are notified.
    pub fn import_local(&self, snapshot: &LocalSnapshot) -> Result<()> {
        snapshot.restore(self.local())?;

        let mut pending = 0u64;
        for collection in &self.config().collections {
            pending += self
                .local()
                .read(collection)?
                .iter()
                .filter(|r| r.needs_sync)
                .count() as u64;
        }
        self.status_board().update(|s| s.pending_uploads = pending);

        tracing::info!(
            collections = snapshot.collections.len(),
            records = snapshot.record_count(),
            pending,
            "Imported local collections"
        );
        Ok(())
    }
}
