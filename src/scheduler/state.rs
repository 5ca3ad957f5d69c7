//! Persisted scheduler state.
//!
//! One small JSON document carrying the scalars the scheduler needs
//! across restarts: the last successful prune time and the earliest
//! start of the next refresh. Stored outside the transactional record
//! store, on the key-value settings surface.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Persisted scheduler scalars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    /// Schema version.
    #[serde(default = "default_state_version")]
    pub version: u8,
    /// Epoch seconds of the last successful prune run.
    #[serde(default)]
    pub last_prune_epoch: Option<u64>,
    /// Epoch seconds before which the next refresh must not start.
    #[serde(default)]
    pub next_refresh_epoch: Option<u64>,
}

fn default_state_version() -> u8 {
    1
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            version: default_state_version(),
            last_prune_epoch: None,
            next_refresh_epoch: None,
        }
    }
}

/// Handle to the state file on disk.
///
/// An explicit dependency injected into the scheduler constructor, so
/// the last-run timestamp is part of its public contract rather than
/// ambient global state.
pub struct StateFile {
    path: Option<PathBuf>,
}

impl StateFile {
    /// State file at the given path.
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// In-memory only: loads defaults, saves nowhere. Used by tests.
    pub fn unsaved() -> Self {
        Self { path: None }
    }

    /// Load persisted state. A missing file yields the defaults.
    pub fn load(&self) -> crate::Result<SyncState> {
        let Some(path) = &self.path else {
            return Ok(SyncState::default());
        };

        let bytes = match std::fs::read(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SyncState::default());
            }
            Err(e) => {
                return Err(crate::SyncError::Scheduler(format!("cannot read state: {e}")));
            }
        };

        serde_json::from_slice(&bytes)
            .map_err(|e| crate::SyncError::Scheduler(format!("cannot parse state: {e}")))
    }

    /// Persist the state, creating parent directories as needed.
    pub fn save(&self, state: &SyncState) -> crate::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::SyncError::Scheduler(format!("cannot create state dir: {e}")))?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| crate::SyncError::Scheduler(format!("cannot serialize state: {e}")))?;

        std::fs::write(path, json)
            .map_err(|e| crate::SyncError::Scheduler(format!("cannot write state: {e}")))?;

        Ok(())
    }
}

/// Current time as epoch seconds.
pub(crate) fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let file = StateFile::new(std::env::temp_dir().join("cinefeed-no-such-state.json"));
        let state = file.load().expect("load");
        assert_eq!(state.last_prune_epoch, None);
        assert_eq!(state.next_refresh_epoch, None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = StateFile::new(dir.path().join("state").join("scheduler.json"));

        let state = SyncState {
            version: 1,
            last_prune_epoch: Some(1_700_000_000),
            next_refresh_epoch: Some(1_700_010_800),
        };
        file.save(&state).expect("save");

        let restored = file.load().expect("load");
        assert_eq!(restored.last_prune_epoch, Some(1_700_000_000));
        assert_eq!(restored.next_refresh_epoch, Some(1_700_010_800));
    }

    #[test]
    fn unsaved_state_file_is_inert() {
        let file = StateFile::unsaved();
        file.save(&SyncState::default()).expect("save");
        let state = file.load().expect("load");
        assert_eq!(state.version, 1);
    }
}
