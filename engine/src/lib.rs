//! # Curtain Engine
//!
//! Offline-first sync for the theatre office.
//!
//! Every write lands in a durable local store first and is pushed to the
//! remote document store when the network allows. The local store is what
//! the UI reads; the remote store is shared between devices.
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`SyncRecord`] is an open JSON object with an `id` and a `_needsSync`
//! flag. Records created locally carry a temporary `temp_...` id until the
//! remote store confirms them and assigns a real one.
//!
//! ### Stores
//!
//! - [`LocalStore`] - synchronous key-value storage, one JSON array per
//!   collection ([`MemoryLocalStore`], [`FileLocalStore`])
//! - [`RemoteStore`] - async document store ([`HttpRemoteStore`] talks to
//!   the `curtain-server` API, [`MemoryRemoteStore`] is for tests)
//!
//! ### Coordinator
//!
//! The [`SyncCoordinator`] owns the [`SyncStatus`] and mediates between the
//! two stores:
//! - [`SyncCoordinator::save_with_sync`] - write locally, then try remotely
//! - [`SyncCoordinator::sync_collection`] - upload pending records, then
//!   merge the remote list over the local one ([`merge_records`])
//! - [`SyncCoordinator::sync_all`] - every configured collection at once
//! - [`SyncCoordinator::update_online_status`] - follow connectivity and
//!   resume syncing when it returns
//!
//! Remote failures never surface as errors to the caller; they are recorded
//! in the status and retried on the next pass.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use curtain_engine::{
//!     CollectionKey, MemoryLocalStore, MemoryRemoteStore, SyncConfig, SyncCoordinator,
//! };
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let remote = Arc::new(MemoryRemoteStore::new());
//! let coordinator = SyncCoordinator::new(
//!     Arc::new(MemoryLocalStore::new()),
//!     remote.clone(),
//!     SyncConfig::default(),
//! );
//!
//! let id = coordinator
//!     .save(CollectionKey::Activities.as_str(), json!({"title": "Dress rehearsal"}))
//!     .await
//!     .unwrap();
//!
//! assert!(!id.starts_with("temp_"));
//! assert_eq!(remote.len("activities"), 1);
//! assert_eq!(coordinator.sync_status().pending_uploads, 0);
//! # });
//! ```
//!
//! ## Persistence
//!
//! [`SyncCoordinator::export_local`] and [`SyncCoordinator::import_local`]
//! move local collections in and out as a [`LocalSnapshot`].

pub mod activity;
pub mod archive;
pub mod collection;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod local;
pub mod merge;
pub mod monitor;
pub mod permission;
pub mod record;
pub mod remote;
pub mod snapshot;
pub mod status;

// Re-export main types at crate root
pub use activity::{Activity, ActivityKind, ActivityReport};
pub use archive::{archive_season, ArchiveBuilder, Season, SeasonArchive, SeasonSummary};
pub use collection::{validate_collection_key, CollectionKey};
pub use config::{ConfigError, SyncConfig};
pub use coordinator::{CollectionSyncReport, SyncCoordinator};
pub use error::{Error, RemoteError};
pub use local::{FileLocalStore, LocalCollections, LocalStore, MemoryLocalStore};
pub use merge::merge_records;
pub use monitor::spawn_connectivity_probe;
pub use permission::{Permission, PermissionSet};
pub use record::SyncRecord;
pub use remote::{HttpRemoteStore, MemoryRemoteStore, RemoteStore};
pub use snapshot::{LocalSnapshot, LOCAL_SNAPSHOT_FORMAT_VERSION};
pub use status::{ListenerId, SyncStatus};

/// Type aliases for clarity
pub type RecordId = String;
pub type CollectionName = String;
