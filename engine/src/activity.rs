//! Theatre activities and the reports written about them.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::Result, Error, RecordId, SyncRecord};

/// What kind of session an activity is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Rehearsal,
    Performance,
    Workshop,
    Meeting,
    #[default]
    Other,
}

/// A scheduled entry in the activity calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Expected number of participants
    #[serde(default)]
    pub participants: u32,
}

impl Activity {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
            kind: ActivityKind::default(),
            location: None,
            description: None,
            participants: 0,
        }
    }

    pub fn with_kind(mut self, kind: ActivityKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_participants(mut self, participants: u32) -> Self {
        self.participants = participants;
        self
    }
}

/// Narrative report on an activity once it has taken place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReport {
    /// Id of the activity the report is about, if it was scheduled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<RecordId>,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub narrative: String,
    /// Participants who actually attended
    #[serde(default)]
    pub participants: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
}

impl ActivityReport {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            activity_id: None,
            title: title.into(),
            date,
            narrative: String::new(),
            participants: 0,
            highlights: Vec::new(),
        }
    }

    pub fn for_activity(mut self, activity_id: impl Into<RecordId>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    pub fn with_narrative(mut self, narrative: impl Into<String>) -> Self {
        self.narrative = narrative.into();
        self
    }

    pub fn with_participants(mut self, participants: u32) -> Self {
        self.participants = participants;
        self
    }
}

/// Serialize a domain value into a save payload.
pub fn to_payload<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Decode a record's payload into a domain value.
pub fn from_record<T: DeserializeOwned>(record: &SyncRecord) -> Result<T> {
    serde_json::from_value(record.payload())
        .map_err(|e| Error::InvalidPayload(format!("record {}: {}", record.id, e)))
}
