//! Wire format of the document store HTTP API.
//!
//! Shared by [`HttpRemoteStore`](super::HttpRemoteStore) and the server.
//! Documents travel as flat JSON objects: `{"id": ..., ...fields}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response to `POST /collections/{collection}/documents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddDocumentResponse {
    pub id: String,
}

/// Response to `GET /collections/{collection}/documents`, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentList {
    pub documents: Vec<Document>,
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Error body returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<Document> for crate::SyncRecord {
    fn from(doc: Document) -> Self {
        let mut data = doc.data;
        data.remove(crate::record::NEEDS_SYNC_FIELD);
        crate::SyncRecord::confirmed(doc.id, data)
    }
}
