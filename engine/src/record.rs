//! Record types flowing through the sync path.

use crate::{error::Result, Error, RecordId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix of ids assigned at local-write time, before the remote store has
/// confirmed the record.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Field carrying the record id.
pub const ID_FIELD: &str = "id";

/// Field flagging a record as not yet confirmed remotely. Never uploaded.
pub const NEEDS_SYNC_FIELD: &str = "_needsSync";

/// Generate a fresh temporary id.
///
/// UUID-backed, so two saves in the same millisecond never collide.
pub fn temp_id() -> RecordId {
    format!("{}{}", TEMP_ID_PREFIX, uuid::Uuid::new_v4().simple())
}

/// Whether an id is a local placeholder.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// A domain record (activity, report, archive) as held in a collection.
///
/// The payload is kept as an open JSON object so that every domain type can
/// flow through the same path. Remote documents carry no `_needsSync` field
/// and deserialize as confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Temporary or store-assigned identifier
    pub id: RecordId,
    /// True until a remote write has been confirmed
    #[serde(rename = "_needsSync", default)]
    pub needs_sync: bool,
    /// Everything else
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SyncRecord {
    /// Create an unconfirmed record under a fresh temporary id.
    pub fn pending(fields: Map<String, Value>) -> Self {
        Self {
            id: temp_id(),
            needs_sync: true,
            fields,
        }
    }

    /// Create a record that already has a store-assigned id.
    pub fn confirmed(id: impl Into<RecordId>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            needs_sync: false,
            fields,
        }
    }

    /// Check if the record still carries a placeholder id.
    pub fn is_temp(&self) -> bool {
        is_temp_id(&self.id)
    }

    /// Swap the placeholder id for the one the remote store assigned.
    pub fn confirm(&mut self, remote_id: impl Into<RecordId>) {
        self.id = remote_id.into();
        self.needs_sync = false;
    }

    /// The upload body: payload fields only, without `id` and `_needsSync`.
    pub fn payload(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Look up a payload field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Validate a caller-supplied payload and unwrap it into its fields.
///
/// The payload must be a JSON object and must not carry the sync fields,
/// which are injected by the coordinator.
pub fn into_payload_fields(data: Value) -> Result<Map<String, Value>> {
    let Value::Object(fields) = data else {
        return Err(Error::InvalidPayload(format!(
            "expected a JSON object, got {}",
            json_kind(&data)
        )));
    };

    for reserved in [ID_FIELD, NEEDS_SYNC_FIELD] {
        if fields.contains_key(reserved) {
            return Err(Error::InvalidPayload(format!(
                "field '{}' is assigned by the sync layer",
                reserved
            )));
        }
    }

    Ok(fields)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
