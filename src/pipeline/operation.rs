//! The unit-of-work abstraction.
//!
//! An operation is a cancellable, observable task with a one-shot
//! completion signal. Synchronous operations finish when their body
//! returns; the asynchronous download operation finishes itself through
//! the same guarded transition, so a cancellation racing a network
//! completion can never double-complete.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const STATE_IDLE: u8 = 0;
const STATE_EXECUTING: u8 = 1;
const STATE_FINISHED: u8 = 2;

/// Shared status handle for one operation.
///
/// Cloneable across tasks via `Arc`; all transitions are atomic.
pub struct OpStatus {
    name: &'static str,
    state: AtomicU8,
    cancel: CancellationToken,
    done_tx: watch::Sender<bool>,
}

impl OpStatus {
    /// Create an idle status bound to the given cancellation token.
    pub(crate) fn new(name: &'static str, cancel: CancellationToken) -> Arc<Self> {
        let (done_tx, _) = watch::channel(false);
        Arc::new(Self {
            name,
            state: AtomicU8::new(STATE_IDLE),
            cancel,
            done_tx,
        })
    }

    /// Node name, used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the operation body is currently running.
    pub fn is_executing(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_EXECUTING
    }

    /// Whether the operation has finished.
    pub fn is_finished(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_FINISHED
    }

    /// Request cancellation.
    ///
    /// On a not-yet-started or already-finished operation this only
    /// sets the flag; on an executing operation the body observes it
    /// cooperatively (between record commits, or by aborting the
    /// in-flight network request).
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Resolves when cancellation is requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Transition idle → executing. Returns `false` if already past idle.
    pub(crate) fn mark_executing(&self) -> bool {
        self.state
            .compare_exchange(
                STATE_IDLE,
                STATE_EXECUTING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Transition executing → finished and fire the completion signal.
    ///
    /// Idempotent guard: calling this when not currently executing is a
    /// no-op, which prevents double-completion when cancellation and
    /// network completion race each other. Returns whether this call
    /// performed the transition.
    pub fn finish(&self) -> bool {
        let transitioned = self
            .state
            .compare_exchange(
                STATE_EXECUTING,
                STATE_FINISHED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if transitioned {
            self.done_tx.send_replace(true);
        }
        transitioned
    }

    /// Resolves when the operation has finished.
    ///
    /// Returns immediately if it already has.
    pub async fn finished(&self) {
        let mut rx = self.done_tx.subscribe();
        // wait_for checks the current value first, so a completion that
        // fired before this call resolves immediately.
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl std::fmt::Debug for OpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpStatus")
            .field("name", &self.name)
            .field("cancelled", &self.is_cancelled())
            .field("executing", &self.is_executing())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// A cancellable unit of work in a pipeline graph.
#[async_trait]
pub trait Operation: Send {
    /// Shared status handle for this operation.
    fn status(&self) -> Arc<OpStatus>;

    /// Execute the operation body.
    ///
    /// Cancelled operations are still driven so they transition to
    /// finished; their bodies return early.
    async fn run(&mut self);
}

/// Drive operations one at a time, in submission order, on a spawned
/// task. Submission does not block the caller.
pub(crate) fn spawn_serial(ops: Vec<Box<dyn Operation>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        for mut op in ops {
            let status = op.status();
            if !status.mark_executing() {
                continue;
            }
            debug!(op = status.name(), "operation started");
            op.run().await;
            // Synchronous operations finish when the body returns; the
            // async download already finished itself, so this is a no-op.
            status.finish();
            debug!(
                op = status.name(),
                cancelled = status.is_cancelled(),
                "operation finished"
            );
        }
    })
}
