//! Remote store - the server-hosted document database.
//!
//! Reachability is never guaranteed. Every call may fail with a
//! [`RemoteError`]; the coordinator decides what a failure means.

mod http;
mod memory;
pub mod wire;

pub use http::HttpRemoteStore;
pub use memory::MemoryRemoteStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::{error::RemoteResult, RecordId, RemoteError, SyncRecord};

/// Client for a document database organised in collections.
///
/// Only `add` and `list` are needed by reconciliation; the rest are used by
/// callers editing or removing confirmed records.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create a document and return the id the store assigned.
    async fn add(&self, collection: &str, data: Value) -> RemoteResult<RecordId>;

    /// Fetch every document in a collection.
    async fn list(&self, collection: &str) -> RemoteResult<Vec<SyncRecord>>;

    /// Fetch one document.
    async fn get(&self, collection: &str, id: &str) -> RemoteResult<SyncRecord>;

    /// Shallow-merge `patch` into a document.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> RemoteResult<()>;

    /// Remove a document.
    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<()>;

    /// Cheap reachability check.
    async fn ping(&self) -> RemoteResult<()>;
}

/// Shallow JSON merge used for `update`: top-level keys of `patch` replace
/// those of `target`; `id` is never overwritten.
pub fn apply_patch(target: &mut serde_json::Map<String, Value>, patch: Value) -> RemoteResult<()> {
    let Value::Object(patch) = patch else {
        return Err(RemoteError::Rejected {
            status: 400,
            message: "patch must be a JSON object".to_string(),
        });
    };

    for (key, value) in patch {
        if key == crate::record::ID_FIELD || key == crate::record::NEEDS_SYNC_FIELD {
            continue;
        }
        target.insert(key, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_replaces_top_level_keys() {
        let mut target = json!({"title": "Old", "participants": 10})
            .as_object()
            .cloned()
            .unwrap();
        apply_patch(&mut target, json!({"title": "New", "id": "hijack"})).unwrap();

        assert_eq!(
            serde_json::Value::Object(target),
            json!({"title": "New", "participants": 10})
        );
    }

    #[test]
    fn patch_must_be_object() {
        let mut target = serde_json::Map::new();
        assert!(matches!(
            apply_patch(&mut target, json!("nope")),
            Err(RemoteError::Rejected { status: 400, .. })
        ));
    }
}
