//! Pipeline graph construction and execution handles.
//!
//! Builds the two standard graph shapes and wires typed hand-off edges
//! between nodes. Relay nodes replace the origin design's ad-hoc
//! closures: each has explicit input/output slots, and the result relay
//! carries the propagate-cancel-if-upstream-failed edge.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::download::DownloadOperation;
use super::fetch_frontier::FetchFrontierOperation;
use super::operation::{OpStatus, Operation, spawn_serial};
use super::persist::PersistOperation;
use super::slot::Slot;
use crate::feed::{FeedError, FeedPage, RemoteFeed};
use crate::pipeline::prune::PruneOperation;
use crate::store::{FeedRecord, RecordStore};

/// Page requested when the store holds no frontier.
const FIRST_PAGE: u32 = 1;

/// Zero-duration relay: turns the frontier record into the next page
/// number for the download node.
///
/// Has no independent failure mode — a missing frontier fails open to
/// page 1, so a local read problem never blocks the network refresh.
struct RelayPageNumber {
    frontier: Arc<Slot<FeedRecord>>,
    page_out: Arc<Slot<u32>>,
    status: Arc<OpStatus>,
}

#[async_trait]
impl Operation for RelayPageNumber {
    fn status(&self) -> Arc<OpStatus> {
        Arc::clone(&self.status)
    }

    async fn run(&mut self) {
        if self.status.is_cancelled() {
            return;
        }
        let next = match self.frontier.take() {
            Some(record) => record.page + 1,
            None => FIRST_PAGE,
        };
        debug!(page = next, "next fetch page");
        self.page_out.put(next);
    }
}

/// Zero-duration relay: moves the downloaded page into the persist
/// node's input, or cancels persist when the download did not succeed.
struct RelayPageResult {
    result_in: Arc<Slot<Result<FeedPage, FeedError>>>,
    page_out: Arc<Slot<FeedPage>>,
    downstream: Arc<OpStatus>,
    status: Arc<OpStatus>,
}

#[async_trait]
impl Operation for RelayPageResult {
    fn status(&self) -> Arc<OpStatus> {
        Arc::clone(&self.status)
    }

    async fn run(&mut self) {
        match self.result_in.take() {
            Some(Ok(page)) if !self.status.is_cancelled() => {
                self.page_out.put(page);
            }
            other => {
                if let Some(Err(e)) = &other {
                    debug!(error = %e, "download did not succeed, cancelling persist");
                }
                // Forward cancellation: persist never executes on
                // failed input.
                self.downstream.cancel();
            }
        }
    }
}

/// One instantiated dependency graph of operations, ready to submit.
///
/// Lifetime is one trigger invocation: created when a refresh or prune
/// trigger fires, consumed by [`PipelineRun::spawn`], and done when the
/// terminal node's completion fires.
pub struct PipelineRun {
    ops: Vec<Box<dyn Operation>>,
    token: CancellationToken,
    terminal: Arc<OpStatus>,
}

impl PipelineRun {
    /// Build the 5-node refresh graph:
    /// `FetchFrontier → RelayPageNumber → Download → RelayPageResult → Persist`.
    pub fn refresh(store: Arc<dyn RecordStore>, feed: Arc<dyn RemoteFeed>) -> Self {
        let token = CancellationToken::new();

        let frontier_slot = Arc::new(Slot::new());
        let page_slot = Arc::new(Slot::new());
        let result_slot = Arc::new(Slot::new());
        let persist_slot = Arc::new(Slot::new());

        let fetch = FetchFrontierOperation::new(
            Arc::clone(&store),
            Arc::clone(&frontier_slot),
            token.child_token(),
        );
        let relay_page = RelayPageNumber {
            frontier: frontier_slot,
            page_out: Arc::clone(&page_slot),
            status: OpStatus::new("relay_page_number", token.child_token()),
        };
        let download = DownloadOperation::new(
            feed,
            page_slot,
            Arc::clone(&result_slot),
            token.child_token(),
        );
        let persist = PersistOperation::new(store, Arc::clone(&persist_slot), token.child_token());
        let terminal = persist.status();
        let relay_result = RelayPageResult {
            result_in: result_slot,
            page_out: persist_slot,
            downstream: persist.status(),
            status: OpStatus::new("relay_page_result", token.child_token()),
        };

        let ops: Vec<Box<dyn Operation>> = vec![
            Box::new(fetch),
            Box::new(relay_page),
            Box::new(download),
            Box::new(relay_result),
            Box::new(persist),
        ];

        Self {
            ops,
            token,
            terminal,
        }
    }

    /// Build the single-node prune graph with a staleness cutoff.
    pub fn prune(store: Arc<dyn RecordStore>, cutoff: DateTime<Utc>) -> Self {
        let token = CancellationToken::new();
        let prune = PruneOperation::new(store, cutoff, token.child_token());
        let terminal = prune.status();

        Self {
            ops: vec![Box::new(prune)],
            token,
            terminal,
        }
    }

    /// The run-wide cancellation token; cancelling it propagates to
    /// every node.
    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Status handle of the terminal node.
    pub fn terminal(&self) -> Arc<OpStatus> {
        Arc::clone(&self.terminal)
    }

    /// Submit all nodes to a fresh serial execution context.
    ///
    /// Does not block; the graph reports completion through the
    /// terminal node's completion signal.
    pub fn spawn(self) -> RunningPipeline {
        let join = spawn_serial(self.ops);
        RunningPipeline {
            token: self.token,
            terminal: self.terminal,
            join,
        }
    }
}

/// A pipeline run submitted to its execution context.
pub struct RunningPipeline {
    token: CancellationToken,
    terminal: Arc<OpStatus>,
    join: tokio::task::JoinHandle<()>,
}

impl RunningPipeline {
    /// Cancel every node in the run.
    pub fn cancel_all(&self) {
        self.token.cancel();
    }

    /// Status handle of the terminal node.
    pub fn terminal(&self) -> Arc<OpStatus> {
        Arc::clone(&self.terminal)
    }

    /// Wait until the terminal node has finished.
    ///
    /// Success means the terminal node was not cancelled, matching the
    /// host-facing binary completion flag.
    pub async fn wait(&self) -> bool {
        self.terminal.finished().await;
        !self.terminal.is_cancelled()
    }

    /// Join handle of the serial execution task.
    pub fn join_handle(&self) -> &tokio::task::JoinHandle<()> {
        &self.join
    }
}
