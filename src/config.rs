//! Configuration types for the sync engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the sync engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote feed settings.
    pub feed: FeedConfig,
    /// Refresh pipeline settings.
    pub sync: RefreshConfig,
    /// Prune pipeline settings.
    pub prune: PruneConfig,
    /// Record store settings.
    pub store: StoreConfig,
}

/// Remote feed endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the feed API.
    pub base_url: String,
    /// API key sent as a query parameter.
    pub api_key: String,
    /// Per-request timeout in seconds.
    ///
    /// This is the HTTP client's own timeout; expiry surfaces as a
    /// network error, not as run cancellation.
    pub request_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_owned(),
            api_key: String::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Refresh pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between refresh triggers.
    pub refresh_interval_secs: u64,
    /// Time budget for one refresh or prune run, in seconds.
    ///
    /// The run's deadline signal fires when the budget elapses.
    pub run_budget_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            // Fetch no more often than every 3 hours.
            refresh_interval_secs: 3 * 3600,
            run_budget_secs: 60,
        }
    }
}

/// Prune pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Minimum seconds between prune runs, regardless of trigger rate.
    pub prune_interval_secs: u64,
    /// Records with a release date older than this window are stale.
    pub retention_secs: u64,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            // Prune the store at most once per week.
            prune_interval_secs: 7 * 24 * 3600,
            retention_secs: 7 * 24 * 3600,
        }
    }
}

/// Record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the SQLite database and scheduler state.
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(crate::SyncError::Config(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        toml::from_str(&contents)
            .map_err(|e| crate::SyncError::Config(format!("cannot parse {}: {e}", path.display())))
    }
}
