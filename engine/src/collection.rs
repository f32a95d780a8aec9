//! Collection keys shared by the local and remote stores.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The collections kept in sync by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionKey {
    Activities,
    ActivityReports,
    SeasonArchives,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 3] = [
        CollectionKey::Activities,
        CollectionKey::ActivityReports,
        CollectionKey::SeasonArchives,
    ];

    /// Storage key, identical on both sides of the sync.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKey::Activities => "activities",
            CollectionKey::ActivityReports => "activity-reports",
            CollectionKey::SeasonArchives => "season-archives",
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CollectionKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for CollectionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CollectionKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::InvalidCollectionKey(s.to_string()))
    }
}

/// Maximum length of a collection key.
pub const MAX_COLLECTION_KEY_LEN: usize = 64;

/// Check that a key can name a collection on both stores.
///
/// Keys are non-empty, at most [`MAX_COLLECTION_KEY_LEN`] bytes, and use only
/// lowercase ASCII letters, digits, `-` and `_`. They double as file names in
/// the file-backed local store and as URL path segments on the server.
pub fn validate_collection_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key.len() <= MAX_COLLECTION_KEY_LEN
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidCollectionKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_strings() {
        for key in CollectionKey::ALL {
            assert_eq!(key.as_str().parse::<CollectionKey>().unwrap(), key);
            assert!(validate_collection_key(key.as_str()).is_ok());
        }
    }

    #[test]
    fn serde_uses_storage_key() {
        let json = serde_json::to_string(&CollectionKey::ActivityReports).unwrap();
        assert_eq!(json, "\"activity-reports\"");
    }

    #[test]
    fn unknown_key_does_not_parse() {
        assert!(matches!(
            "archives".parse::<CollectionKey>(),
            Err(Error::InvalidCollectionKey(_))
        ));
    }

    #[test]
    fn validation_rejects_bad_keys() {
        assert!(validate_collection_key("").is_err());
        assert!(validate_collection_key("Activities").is_err());
        assert!(validate_collection_key("../etc").is_err());
        assert!(validate_collection_key("year project").is_err());
        assert!(validate_collection_key(&"a".repeat(MAX_COLLECTION_KEY_LEN + 1)).is_err());
        assert!(validate_collection_key("year-project_2025").is_ok());
    }
}
