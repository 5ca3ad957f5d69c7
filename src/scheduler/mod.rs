//! Background run scheduling.
//!
//! The [`Scheduler`] owns the store and the remote feed, builds one
//! pipeline per requested run, and supervises it against a deadline
//! token. Each run is single-flight per kind: a refresh request while
//! a refresh is already executing is rejected, and likewise for prune.
//! Prune requests are additionally throttled by the persisted
//! last-prune timestamp, checked before any pipeline work begins.

mod runner;
mod state;

pub use runner::SyncRunner;
pub use state::{StateFile, SyncState};

use crate::config::SyncConfig;
use crate::feed::RemoteFeed;
use crate::pipeline::PipelineRun;
use crate::store::RecordStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Which pipeline a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Refresh,
    Prune,
}

impl std::fmt::Display for RunKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Refresh => write!(f, "refresh"),
            Self::Prune => write!(f, "prune"),
        }
    }
}

/// Outcome of one supervised run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub kind: RunKind,
    /// True when the terminal operation completed without cancellation.
    pub success: bool,
}

/// Handle to a run in flight.
pub struct RunHandle {
    kind: RunKind,
    rx: oneshot::Receiver<RunReport>,
}

impl RunHandle {
    pub fn kind(&self) -> RunKind {
        self.kind
    }

    /// Wait for the run to settle and return its report.
    ///
    /// A dropped supervisor counts as failure rather than a panic.
    pub async fn outcome(self) -> RunReport {
        let kind = self.kind;
        self.rx.await.unwrap_or(RunReport {
            kind,
            success: false,
        })
    }
}

/// Builds and supervises sync pipelines.
pub struct Scheduler {
    store: Arc<dyn RecordStore>,
    feed: Arc<dyn RemoteFeed>,
    refresh_interval: Duration,
    prune_interval: Duration,
    retention: Duration,
    run_budget: Duration,
    state: Arc<Mutex<SyncState>>,
    state_file: Arc<StateFile>,
    refresh_inflight: Arc<AtomicBool>,
    prune_inflight: Arc<AtomicBool>,
}

impl Scheduler {
    /// Construct a scheduler over the given store and feed.
    ///
    /// Loads persisted state from `state_file`; a missing file starts
    /// from defaults, so the first prune request is always eligible.
    pub fn new(
        store: Arc<dyn RecordStore>,
        feed: Arc<dyn RemoteFeed>,
        config: &SyncConfig,
        state_file: StateFile,
    ) -> crate::Result<Self> {
        let state = state_file.load()?;
        Ok(Self {
            store,
            feed,
            refresh_interval: Duration::from_secs(config.sync.refresh_interval_secs),
            prune_interval: Duration::from_secs(config.prune.prune_interval_secs),
            retention: Duration::from_secs(config.prune.retention_secs),
            run_budget: Duration::from_secs(config.sync.run_budget_secs),
            state: Arc::new(Mutex::new(state)),
            state_file: Arc::new(state_file),
            refresh_inflight: Arc::new(AtomicBool::new(false)),
            prune_inflight: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Wall-clock budget granted to a single run.
    pub fn run_budget(&self) -> Duration {
        self.run_budget
    }

    /// True when the persisted next-refresh mark has passed (or was
    /// never set).
    pub fn refresh_due(&self, now_epoch: u64) -> bool {
        self.locked_state()
            .next_refresh_epoch
            .map_or(true, |next| now_epoch >= next)
    }

    /// True when the last successful prune is older than the prune
    /// interval. A store that was never pruned is always due.
    pub fn prune_due(&self, now_epoch: u64) -> bool {
        self.locked_state()
            .last_prune_epoch
            .map_or(true, |last| now_epoch > last + self.prune_interval.as_secs())
    }

    /// Epoch seconds of the last successful prune, if any.
    pub fn last_prune_epoch(&self) -> Option<u64> {
        self.locked_state().last_prune_epoch
    }

    /// Start a refresh run unless one is already executing.
    ///
    /// The next-refresh mark is re-armed as soon as the run starts,
    /// regardless of how it ends; a failed run waits out the full
    /// interval like a successful one.
    pub fn start_refresh(&self, deadline: CancellationToken) -> Option<RunHandle> {
        if self.refresh_inflight.swap(true, Ordering::AcqRel) {
            debug!("refresh already in flight, skipping");
            return None;
        }

        {
            let mut state = self.locked_state();
            state.next_refresh_epoch =
                Some(state::now_epoch_secs() + self.refresh_interval.as_secs());
            self.persist(&state);
        }

        let run = PipelineRun::refresh(Arc::clone(&self.store), Arc::clone(&self.feed));
        Some(self.supervise(RunKind::Refresh, run, deadline))
    }

    /// Start a prune run if one is due and none is executing.
    ///
    /// The throttle is checked before any pipeline is constructed, so
    /// an early-out costs no store work.
    pub fn start_prune(&self, deadline: CancellationToken) -> Option<RunHandle> {
        if !self.prune_due(state::now_epoch_secs()) {
            debug!("prune not due yet, skipping");
            return None;
        }
        if self.prune_inflight.swap(true, Ordering::AcqRel) {
            debug!("prune already in flight, skipping");
            return None;
        }

        let cutoff = chrono::Utc::now()
            - chrono::Duration::seconds(self.retention.as_secs() as i64);
        let run = PipelineRun::prune(Arc::clone(&self.store), cutoff);
        Some(self.supervise(RunKind::Prune, run, deadline))
    }

    /// Seed the store on startup.
    ///
    /// With `force` the store is wiped first. An empty store triggers
    /// one immediate refresh; on success the prune clock is reset so
    /// freshly loaded records are not pruned straight away.
    pub async fn load_initial_data(&self, force: bool) -> crate::Result<()> {
        if force {
            self.store
                .delete_all()
                .map_err(|e| crate::SyncError::Store(e.to_string()))?;
        }

        let empty = self
            .store
            .is_empty()
            .map_err(|e| crate::SyncError::Store(e.to_string()))?;
        if !empty {
            debug!("store already populated");
            return Ok(());
        }

        info!("store empty, running initial refresh");
        let deadline = CancellationToken::new();
        let Some(handle) = self.start_refresh(deadline) else {
            return Ok(());
        };
        let report = handle.outcome().await;
        if report.success {
            let mut state = self.locked_state();
            state.last_prune_epoch = None;
            self.persist(&state);
        } else {
            warn!("initial refresh did not complete");
        }
        Ok(())
    }

    /// Spawn a supervisor for the run and hand back its report channel.
    fn supervise(
        &self,
        kind: RunKind,
        run: PipelineRun,
        deadline: CancellationToken,
    ) -> RunHandle {
        let (tx, rx) = oneshot::channel();
        let state = Arc::clone(&self.state);
        let state_file = Arc::clone(&self.state_file);
        let inflight = match kind {
            RunKind::Refresh => Arc::clone(&self.refresh_inflight),
            RunKind::Prune => Arc::clone(&self.prune_inflight),
        };

        let running = run.spawn();
        tokio::spawn(async move {
            let terminal = running.terminal();
            tokio::select! {
                _ = deadline.cancelled() => {
                    info!(%kind, "deadline reached, cancelling run");
                    running.cancel_all();
                    terminal.finished().await;
                }
                _ = terminal.finished() => {}
            }

            let success = !terminal.is_cancelled();
            if success {
                info!(%kind, "run completed");
            } else {
                warn!(%kind, "run cancelled or failed");
            }

            if success && kind == RunKind::Prune {
                match state.lock() {
                    Ok(mut guard) => {
                        guard.last_prune_epoch = Some(state::now_epoch_secs());
                        if let Err(e) = state_file.save(&guard) {
                            warn!(error = %e, "failed to persist scheduler state");
                        }
                    }
                    Err(poisoned) => {
                        poisoned.into_inner().last_prune_epoch = Some(state::now_epoch_secs());
                    }
                }
            }

            inflight.store(false, Ordering::Release);
            let _ = tx.send(RunReport { kind, success });
        });

        RunHandle { kind, rx }
    }

    fn locked_state(&self) -> std::sync::MutexGuard<'_, SyncState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self, state: &SyncState) {
        if let Err(e) = self.state_file.save(state) {
            warn!(error = %e, "failed to persist scheduler state");
        }
    }
}
