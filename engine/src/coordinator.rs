//! Sync coordinator - the single choke point for "write locally, then try
//! to push remotely".
//!
//! Saves always land in the local store first. Remote failures on the save
//! and sync paths never turn into errors for the caller: they are recorded
//! in the [`SyncStatus`] and retried on the next sync pass. Edits and
//! deletes of confirmed records need the remote store and are not queued.

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::validate_collection_key;
use crate::error::{RemoteResult, Result};
use crate::local::{FileLocalStore, LocalCollections, LocalStore};
use crate::merge::merge_records;
use crate::record::into_payload_fields;
use crate::remote::{apply_patch, HttpRemoteStore, RemoteStore};
use crate::status::{ListenerId, StatusBoard, SyncStatus};
use crate::{CollectionName, Error, RecordId, RemoteError, SyncConfig, SyncRecord};

/// Outcome of one sync pass over one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSyncReport {
    pub collection: CollectionName,
    /// Records found waiting for upload
    pub attempted: usize,
    /// Uploads the remote store confirmed
    pub uploaded: usize,
    /// Uploads that failed and stay pending
    pub failed: usize,
    /// Size of the merged collection, `None` if the remote list failed
    pub merged: Option<usize>,
    /// The pass did nothing because the coordinator was offline
    pub skipped_offline: bool,
}

impl CollectionSyncReport {
    fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            attempted: 0,
            uploaded: 0,
            failed: 0,
            merged: None,
            skipped_offline: false,
        }
    }
}

/// Mediates between the local store and the remote store and owns the
/// sync status.
///
/// Construct one per application and share it as `Arc<SyncCoordinator>`.
pub struct SyncCoordinator {
    local: LocalCollections,
    remote: Arc<dyn RemoteStore>,
    status: StatusBoard,
    config: SyncConfig,
    pub(crate) monitoring: AtomicBool,
}

impl SyncCoordinator {
    /// Create a coordinator over the given stores.
    pub fn new(local: Arc<dyn LocalStore>, remote: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        Self {
            local: LocalCollections::new(local),
            remote,
            status: StatusBoard::new(config.start_online),
            config,
            monitoring: AtomicBool::new(false),
        }
    }

    /// Open a coordinator from configuration: a file-backed local store in
    /// `data_dir` and the HTTP document store at `remote_url`.
    pub fn open(config: SyncConfig) -> Result<Self> {
        let local = FileLocalStore::open(&config.data_dir)?;
        let url = config
            .remote_url
            .as_deref()
            .ok_or(Error::MissingConfig("remote_url"))?;
        let remote = match &config.remote_token {
            Some(token) => HttpRemoteStore::new(url).with_token(token.clone()),
            None => HttpRemoteStore::new(url),
        };

        tracing::info!(
            data_dir = %config.data_dir.display(),
            remote_url = %url,
            collections = config.collections.len(),
            "Opening sync coordinator"
        );
        Ok(Self::new(Arc::new(local), Arc::new(remote), config))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn local(&self) -> &LocalCollections {
        &self.local
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    /// Copy of the current status.
    pub fn sync_status(&self) -> SyncStatus {
        self.status.snapshot()
    }

    /// Drop all recorded errors. Leaves counters and `last_sync` alone.
    pub fn clear_errors(&self) {
        self.status.update(|s| s.errors.clear());
    }

    /// Register a listener called with a status copy after every change.
    pub fn add_sync_status_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SyncStatus) + Send + Sync + 'static,
    {
        self.status.add_listener(Arc::new(listener))
    }

    /// Detach a listener. Returns false if it was not registered.
    pub fn remove_sync_status_listener(&self, id: ListenerId) -> bool {
        self.status.remove_listener(id)
    }

    /// Records currently held locally for a collection.
    pub fn records(&self, collection: &str) -> Result<Vec<SyncRecord>> {
        self.local.read(collection)
    }

    /// Save a record locally, then push it with `remote_write` if online.
    ///
    /// The record is persisted under a temporary id before `remote_write` is
    /// called. Returns the remote id if the write was confirmed, otherwise
    /// the temporary id. Only local storage failures and invalid payloads
    /// are returned as errors.
    pub async fn save_with_sync<F, Fut>(
        &self,
        collection: &str,
        data: Value,
        remote_write: F,
    ) -> Result<RecordId>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RemoteResult<RecordId>>,
    {
        validate_collection_key(collection)?;
        let record = SyncRecord::pending(into_payload_fields(data)?);
        let temp_id = record.id.clone();
        self.local.append(collection, record)?;

        if !self.status.is_online() {
            tracing::debug!(collection = %collection, record_id = %temp_id, "Offline, deferring upload");
            self.status.update(|s| s.pending_uploads += 1);
            return Ok(temp_id);
        }

        match self.call_remote(remote_write()).await {
            Ok(remote_id) => {
                if !self.local.confirm(collection, &temp_id, &remote_id)? {
                    tracing::warn!(
                        collection = %collection,
                        record_id = %temp_id,
                        "Saved record vanished locally before confirmation"
                    );
                }
                tracing::debug!(collection = %collection, record_id = %remote_id, "Record saved and synced");
                Ok(remote_id)
            }
            Err(e) => {
                tracing::warn!(collection = %collection, record_id = %temp_id, error = %e, "Remote write failed, keeping record pending");
                self.status.update(|s| {
                    s.pending_uploads += 1;
                    s.errors.push(format!("Failed to save {} item {}: {}", collection, temp_id, e));
                });
                Ok(temp_id)
            }
        }
    }

    /// Save a record through [`save_with_sync`](Self::save_with_sync) using
    /// the configured remote store's `add`.
    pub async fn save(&self, collection: &str, data: Value) -> Result<RecordId> {
        let remote = Arc::clone(&self.remote);
        let upload = data.clone();
        let key = collection.to_string();
        self.save_with_sync(collection, data, move || async move {
            remote.add(&key, upload).await
        })
        .await
    }

    /// Shallow-merge `patch` into a record. Returns false if the record is
    /// not held locally.
    ///
    /// Records still under a temporary id are edited locally only; the
    /// edited payload goes up with their upload. Confirmed records are
    /// patched remotely first and locally only once the remote store has
    /// accepted the edit. While offline
    /// that fails with [`Error::Offline`], and a failed remote call is
    /// returned as [`Error::Remote`] with the local copy left untouched.
    pub async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<bool> {
        validate_collection_key(collection)?;
        if !patch.is_object() {
            return Err(Error::InvalidPayload("patch must be a JSON object".to_string()));
        }
        if !self.local.read(collection)?.iter().any(|r| r.id == id) {
            return Ok(false);
        }

        let local_patch = patch.clone();
        if !crate::record::is_temp_id(id) {
            self.require_online("update")?;
            if let Err(e) = self.call_remote(self.remote.update(collection, id, patch)).await {
                tracing::warn!(collection = %collection, record_id = %id, error = %e, "Remote update failed, local copy unchanged");
                self.record_error(format!("Failed to update {} item {}: {}", collection, id, e));
                return Err(e.into());
            }
        }

        self.local.update(collection, |records| {
            match records.iter_mut().find(|r| r.id == id) {
                Some(record) => apply_patch(&mut record.fields, local_patch).is_ok(),
                None => false,
            }
        })
    }

    /// Delete a record. Returns false if the record is not held locally.
    ///
    /// Confirmed records are deleted remotely first, with the same offline
    /// and failure rules as [`update`](Self::update). A remote `NotFound`
    /// counts as deleted.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        validate_collection_key(collection)?;
        if !self.local.read(collection)?.iter().any(|r| r.id == id) {
            return Ok(false);
        }

        if !crate::record::is_temp_id(id) {
            self.require_online("delete")?;
            match self.call_remote(self.remote.delete(collection, id)).await {
                Ok(()) | Err(RemoteError::NotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(collection = %collection, record_id = %id, error = %e, "Remote delete failed, local copy kept");
                    self.record_error(format!("Failed to delete {} item {}: {}", collection, id, e));
                    return Err(e.into());
                }
            }
        }

        self.local.update(collection, |records| {
            let before = records.len();
            records.retain(|r| r.id != id);
            records.len() != before
        })
    }

    /// Run one sync pass over a collection and notify listeners.
    pub async fn sync_collection(&self, collection: &str) -> Result<CollectionSyncReport> {
        let report = self.sync_collection_inner(collection).await?;
        if !report.skipped_offline {
            self.status.notify();
        }
        Ok(report)
    }

    /// Sync every configured collection concurrently.
    ///
    /// Clears errors first, sets `last_sync` once every pass has settled and
    /// notifies listeners once. Does nothing while offline.
    pub async fn sync_all(&self) -> Vec<CollectionSyncReport> {
        if !self.status.is_online() {
            tracing::debug!("Offline, skipping sync pass");
            return Vec::new();
        }

        self.status.update_quiet(|s| s.errors.clear());

        let passes = self.config.collections.iter().map(|collection| async move {
            (collection, self.sync_collection_inner(collection).await)
        });
        let results = join_all(passes).await;

        let mut reports = Vec::with_capacity(results.len());
        for (collection, result) in results {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!(collection = %collection, error = %e, "Sync pass failed");
                    self.status.update_quiet(|s| {
                        s.errors.push(format!("Failed to sync {}: {}", collection, e))
                    });
                }
            }
        }

        let status = self.status.update_quiet(|s| {
            s.last_sync = Some(Utc::now());
            s.clone()
        });
        self.status.notify();

        tracing::info!(
            collections = reports.len(),
            uploaded = reports.iter().map(|r| r.uploaded).sum::<usize>(),
            errors = status.errors.len(),
            pending = status.pending_uploads,
            "Sync pass complete"
        );
        reports
    }

    /// Apply a connectivity change.
    ///
    /// Going online triggers one immediate [`sync_all`](Self::sync_all);
    /// returns true when it did. Repeating the current state is a no-op.
    pub async fn update_online_status(&self, online: bool) -> bool {
        let was_online = self
            .status
            .update_quiet(|s| std::mem::replace(&mut s.is_online, online));
        if was_online == online {
            return false;
        }
        self.status.notify();

        if online {
            tracing::info!("Connection restored, resuming sync");
            self.sync_all().await;
            true
        } else {
            tracing::warn!("Connection lost, deferring uploads");
            false
        }
    }

    async fn sync_collection_inner(&self, collection: &str) -> Result<CollectionSyncReport> {
        let mut report = CollectionSyncReport::new(collection);
        if !self.status.is_online() {
            report.skipped_offline = true;
            return Ok(report);
        }

        let pending: Vec<SyncRecord> = self
            .local
            .read(collection)?
            .into_iter()
            .filter(|r| r.needs_sync)
            .collect();
        report.attempted = pending.len();

        for record in &pending {
            match self.call_remote(self.remote.add(collection, record.payload())).await {
                Ok(remote_id) => {
                    self.local.confirm(collection, &record.id, &remote_id)?;
                    report.uploaded += 1;
                    tracing::debug!(collection = %collection, temp_id = %record.id, record_id = %remote_id, "Uploaded pending record");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(collection = %collection, record_id = %record.id, error = %e, "Upload failed");
                    self.status.update_quiet(|s| {
                        s.errors.push(format!(
                            "Failed to sync {} item {}: {}",
                            collection, record.id, e
                        ))
                    });
                }
            }
        }

        match self.call_remote(self.remote.list(collection)).await {
            Ok(remote) => {
                let merged = self.local.update(collection, |local| {
                    *local = merge_records(local, &remote);
                    local.len()
                })?;
                report.merged = Some(merged);
            }
            Err(e) => {
                tracing::warn!(collection = %collection, error = %e, "Fetching remote collection failed, skipping merge");
                self.status.update_quiet(|s| {
                    s.errors.push(format!("Failed to fetch {}: {}", collection, e))
                });
            }
        }

        // Counts attempts, not successes: a failed upload stops counting as
        // pending even though the record still needs sync.
        let attempted = report.attempted as u64;
        self.status
            .update_quiet(|s| s.pending_uploads = s.pending_uploads.saturating_sub(attempted));

        Ok(report)
    }

    async fn call_remote<T>(&self, call: impl Future<Output = RemoteResult<T>>) -> RemoteResult<T> {
        match self.config.remote_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(RemoteError::Timeout(limit))),
            None => call.await,
        }
    }

    fn require_online(&self, operation: &'static str) -> Result<()> {
        if self.status.is_online() {
            Ok(())
        } else {
            Err(Error::Offline(operation))
        }
    }

    pub(crate) fn record_error(&self, message: String) {
        self.status.update(|s| s.errors.push(message));
    }

    pub(crate) fn status_board(&self) -> &StatusBoard {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::MemoryLocalStore;
    use crate::remote::MemoryRemoteStore;
    use serde_json::json;

    fn coordinator() -> (Arc<MemoryRemoteStore>, SyncCoordinator) {
        let remote = Arc::new(MemoryRemoteStore::new());
        let coordinator = SyncCoordinator::new(
            Arc::new(MemoryLocalStore::new()),
            remote.clone(),
            SyncConfig::default(),
        );
        (remote, coordinator)
    }

    #[test]
    fn open_needs_a_remote_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SyncConfig::default();
        config.data_dir = dir.path().join("data");

        assert!(matches!(
            SyncCoordinator::open(config.clone()),
            Err(Error::MissingConfig("remote_url"))
        ));

        config.remote_url = Some("http://localhost:3000".into());
        let coordinator = SyncCoordinator::open(config).unwrap();
        assert!(coordinator.records("activities").unwrap().is_empty());
        assert!(dir.path().join("data").is_dir());
    }

    #[tokio::test]
    async fn save_rejects_reserved_fields() {
        let (_, coordinator) = coordinator();
        let result = coordinator
            .save("activities", json!({"id": "mine", "title": "A"}))
            .await;
        assert!(matches!(result, Err(crate::Error::InvalidPayload(_))));
        assert!(coordinator.records("activities").unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_rejects_bad_collection_key() {
        let (_, coordinator) = coordinator();
        let result = coordinator.save("", json!({"title": "A"})).await;
        assert!(matches!(result, Err(crate::Error::InvalidCollectionKey(_))));
    }

    #[tokio::test]
    async fn save_uses_remote_add() {
        let (remote, coordinator) = coordinator();
        let id = coordinator
            .save("activities", json!({"title": "Dress rehearsal"}))
            .await
            .unwrap();

        let stored = remote.get("activities", &id).await.unwrap();
        assert_eq!(stored.get("title"), Some(&json!("Dress rehearsal")));
        assert!(!stored.fields.contains_key("_needsSync"));
    }

    #[tokio::test]
    async fn update_patches_local_and_remote() {
        let (remote, coordinator) = coordinator();
        let id = coordinator
            .save("activities", json!({"title": "Draft"}))
            .await
            .unwrap();

        assert!(coordinator
            .update("activities", &id, json!({"title": "Final"}))
            .await
            .unwrap());

        let local = coordinator.records("activities").unwrap();
        assert_eq!(local[0].get("title"), Some(&json!("Final")));
        let stored = remote.get("activities", &id).await.unwrap();
        assert_eq!(stored.get("title"), Some(&json!("Final")));
    }

    #[tokio::test]
    async fn delete_removes_local_and_remote() {
        let (remote, coordinator) = coordinator();
        let id = coordinator
            .save("activities", json!({"title": "Cancelled"}))
            .await
            .unwrap();

        assert!(coordinator.delete("activities", &id).await.unwrap());
        assert!(!coordinator.delete("activities", &id).await.unwrap());
        assert!(coordinator.records("activities").unwrap().is_empty());
        assert!(remote.is_empty("activities"));
    }

    #[tokio::test]
    async fn sync_all_offline_is_noop() {
        let (remote, coordinator) = coordinator();
        coordinator.update_online_status(false).await;

        assert!(coordinator.sync_all().await.is_empty());
        assert_eq!(remote.list_calls(), 0);
        assert_eq!(coordinator.sync_status().last_sync, None);
    }

    #[tokio::test]
    async fn sync_collection_reports_skipped_offline() {
        let (_, coordinator) = coordinator();
        coordinator.update_online_status(false).await;

        let report = coordinator.sync_collection("activities").await.unwrap();
        assert!(report.skipped_offline);
        assert_eq!(report.attempted, 0);
    }

    #[tokio::test]
    async fn remote_timeout_is_recorded_as_error() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let coordinator = SyncCoordinator::new(
            Arc::new(MemoryLocalStore::new()),
            remote,
            SyncConfig::default().with_remote_timeout(Some(std::time::Duration::from_millis(20))),
        );

        let id = coordinator
            .save_with_sync("activities", json!({"title": "Slow"}), || {
                futures::future::pending::<RemoteResult<RecordId>>()
            })
            .await
            .unwrap();

        assert!(crate::record::is_temp_id(&id));
        let status = coordinator.sync_status();
        assert_eq!(status.pending_uploads, 1);
        assert!(status.errors[0].contains("timed out"));
    }
}
