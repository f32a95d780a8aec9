//! Sync status shown to the UI, and the listeners watching it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// What the status indicator renders: connectivity, pending count, errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Mirrors the connectivity signal
    pub is_online: bool,
    /// End of the last full sync pass, never cleared
    pub last_sync: Option<DateTime<Utc>>,
    /// Records known to be waiting for upload
    pub pending_uploads: u64,
    /// Failure messages from saves and sync passes
    pub errors: Vec<String>,
}

impl SyncStatus {
    pub fn new(is_online: bool) -> Self {
        Self {
            is_online,
            last_sync: None,
            pending_uploads: 0,
            errors: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Callback receiving a copy of the status after each change.
pub type StatusListener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

/// Handle returned on registration, used to detach a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Owns the status and the listener registry.
///
/// Listeners run synchronously in registration order, outside the status
/// lock, each with its own copy of the status.
pub struct StatusBoard {
    status: Mutex<SyncStatus>,
    listeners: Mutex<Vec<(ListenerId, StatusListener)>>,
    next_listener: AtomicU64,
}

impl StatusBoard {
    pub fn new(is_online: bool) -> Self {
        Self {
            status: Mutex::new(SyncStatus::new(is_online)),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Copy of the current status.
    pub fn snapshot(&self) -> SyncStatus {
        self.status.lock().clone()
    }

    pub fn is_online(&self) -> bool {
        self.status.lock().is_online
    }

    /// Register a listener. Registering the same closure twice yields two
    /// notifications per change.
    pub fn add_listener(&self, listener: StatusListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Detach a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Mutate the status and notify listeners.
    pub fn update<T>(&self, f: impl FnOnce(&mut SyncStatus) -> T) -> T {
        let (out, snapshot) = {
            let mut status = self.status.lock();
            let out = f(&mut status);
            (out, status.clone())
        };
        self.broadcast(&snapshot);
        out
    }

    /// Mutate the status without notifying; pair with [`notify`](Self::notify).
    pub fn update_quiet<T>(&self, f: impl FnOnce(&mut SyncStatus) -> T) -> T {
        f(&mut self.status.lock())
    }

    /// Notify listeners with the current status.
    pub fn notify(&self) {
        let snapshot = self.snapshot();
        self.broadcast(&snapshot);
    }

    fn broadcast(&self, snapshot: &SyncStatus) {
        let listeners: Vec<StatusListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}
