//! Periodic driver for the scheduler.
//!
//! Ticks on a coarse interval, asks the scheduler whether each run
//! kind is due, and supervises anything it starts. Every settled run
//! is forwarded on a report channel so the host can log or react.

use super::state;
use super::{RunReport, Scheduler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How often the runner checks for due work.
const TICK_INTERVAL_SECS: u64 = 60;

/// Drives refresh and prune runs on a fixed tick.
pub struct SyncRunner {
    scheduler: Arc<Scheduler>,
    report_tx: mpsc::UnboundedSender<RunReport>,
    tick: Duration,
    budget: Duration,
}

impl SyncRunner {
    /// Runner over the given scheduler, reporting each settled run on
    /// `report_tx`.
    pub fn new(scheduler: Arc<Scheduler>, report_tx: mpsc::UnboundedSender<RunReport>) -> Self {
        let budget = scheduler.run_budget();
        Self {
            scheduler,
            report_tx,
            tick: Duration::from_secs(TICK_INTERVAL_SECS),
            budget,
        }
    }

    /// Override the tick interval. Used by tests.
    #[cfg(test)]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Spawn the tick loop. The loop exits when the report channel
    /// closes.
    pub fn run(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !self.tick_once().await {
                    debug!("report channel closed, stopping runner");
                    return;
                }
            }
        })
    }

    /// Run everything currently due. Returns false once the report
    /// channel has closed.
    async fn tick_once(&self) -> bool {
        let now = state::now_epoch_secs();

        if self.scheduler.refresh_due(now) {
            if let Some(handle) = self.scheduler.start_refresh(self.deadline_token()) {
                let report = handle.outcome().await;
                if self.report_tx.send(report).is_err() {
                    return false;
                }
            }
        }

        if let Some(handle) = self.scheduler.start_prune(self.deadline_token()) {
            let report = handle.outcome().await;
            if self.report_tx.send(report).is_err() {
                return false;
            }
        }

        true
    }

    /// Token that fires after the run budget elapses.
    fn deadline_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let budget = self.budget;
        let armed = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            armed.cancel();
        });
        token
    }
}
