//! Sync configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::collection::{validate_collection_key, CollectionKey};
use crate::CollectionName;

/// Default interval between automatic sync passes.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default interval between reachability probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Default deadline for a single remote call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a [`SyncCoordinator`](crate::SyncCoordinator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Directory of the file-backed local store
    pub data_dir: PathBuf,
    /// Base URL of the document store server
    pub remote_url: Option<String>,
    /// Bearer token sent to the server
    pub remote_token: Option<String>,
    /// Collections reconciled by `sync_all`
    pub collections: Vec<CollectionName>,
    /// Period of the automatic sync task
    pub sync_interval: Duration,
    /// Period of the reachability probe
    pub probe_interval: Duration,
    /// Deadline for each remote call; `None` waits forever
    pub remote_timeout: Option<Duration>,
    /// Connectivity assumed before the first signal arrives
    pub start_online: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("curtain-data"),
            remote_url: None,
            remote_token: None,
            collections: CollectionKey::ALL
                .iter()
                .map(|k| k.as_str().to_string())
                .collect(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            remote_timeout: Some(DEFAULT_REMOTE_TIMEOUT),
            start_online: true,
        }
    }
}

impl SyncConfig {
    /// Load configuration from `CURTAIN_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(dir) = env::var("CURTAIN_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        config.remote_url = env::var("CURTAIN_REMOTE_URL").ok().filter(|s| !s.is_empty());
        config.remote_token = env::var("CURTAIN_REMOTE_TOKEN").ok().filter(|s| !s.is_empty());

        if let Ok(list) = env::var("CURTAIN_COLLECTIONS") {
            config.collections = parse_collections(&list)?;
        }

        if let Some(secs) = read_u64("CURTAIN_SYNC_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(ConfigError::Invalid("CURTAIN_SYNC_INTERVAL_SECS"));
            }
            config.sync_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = read_u64("CURTAIN_PROBE_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(ConfigError::Invalid("CURTAIN_PROBE_INTERVAL_SECS"));
            }
            config.probe_interval = Duration::from_secs(secs);
        }

        if let Some(ms) = read_u64("CURTAIN_REMOTE_TIMEOUT_MS")? {
            config.remote_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        Ok(config)
    }

    /// Replace the synced collection list.
    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CollectionName>,
    {
        self.collections = collections.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_start_online(mut self, online: bool) -> Self {
        self.start_online = online;
        self
    }
}

fn read_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

fn parse_collections(list: &str) -> Result<Vec<CollectionName>, ConfigError> {
    let collections: Vec<CollectionName> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if collections.is_empty() {
        return Err(ConfigError::Invalid("CURTAIN_COLLECTIONS"));
    }
    for key in &collections {
        validate_collection_key(key).map_err(|_| ConfigError::InvalidCollection(key.clone()))?;
    }
    Ok(collections)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {0} value")]
    Invalid(&'static str),

    #[error("Invalid collection key in CURTAIN_COLLECTIONS: {0:?}")]
    InvalidCollection(String),
}
