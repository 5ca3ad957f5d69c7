//! Shared fakes for unit tests.

use crate::feed::{FeedError, FeedPage, RemoteFeed, ServerEntry};
use crate::pipeline::{OpStatus, Operation};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Remote feed that replays a fixed script of page results.
pub struct ScriptedFeed {
    script: Mutex<VecDeque<Result<FeedPage, FeedError>>>,
    calls: AtomicUsize,
    pages: Mutex<Vec<u32>>,
    hold_forever: bool,
}

impl ScriptedFeed {
    /// Feed that returns the given results in order, then
    /// [`FeedError::EmptyResponse`] once the script runs out.
    pub fn with_results(script: Vec<Result<FeedPage, FeedError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            pages: Mutex::new(Vec::new()),
            hold_forever: false,
        })
    }

    /// Feed whose requests never resolve. For cancellation tests.
    pub fn holding() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            pages: Mutex::new(Vec::new()),
            hold_forever: true,
        })
    }

    /// A page whose entries carry the given ids.
    pub fn page(page_number: u32, ids: &[i64]) -> FeedPage {
        let entries = ids
            .iter()
            .map(|id| ServerEntry {
                id: *id,
                title: Some(format!("movie {id}")),
                overview: Some(format!("overview {id}")),
                poster_path: None,
                release_date: Some("2024-05-01".to_owned()),
                popularity: Some(*id as f64),
            })
            .collect();
        FeedPage {
            page_number,
            entries,
        }
    }

    /// Number of fetches attempted so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every page number requested, in order.
    pub fn requested_pages(&self) -> Vec<u32> {
        match self.pages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl RemoteFeed for ScriptedFeed {
    async fn fetch_page(&self, page_number: u32) -> Result<FeedPage, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.lock() {
            Ok(mut guard) => guard.push(page_number),
            Err(poisoned) => poisoned.into_inner().push(page_number),
        }

        if self.hold_forever {
            std::future::pending::<()>().await;
        }

        let next = match self.script.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or(Err(FeedError::EmptyResponse))
    }
}

/// Operation that appends its label to a shared log when run.
pub struct RecordingOperation {
    label: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
    status: Arc<OpStatus>,
}

impl RecordingOperation {
    /// Fresh shared log for a group of recording operations.
    pub fn log() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn new(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Self {
        Self {
            label,
            log: Arc::clone(log),
            status: OpStatus::new(label, CancellationToken::new()),
        }
    }

    /// Snapshot of the log contents.
    pub fn entries(log: &Arc<Mutex<Vec<&'static str>>>) -> Vec<&'static str> {
        match log.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Operation for RecordingOperation {
    fn status(&self) -> Arc<OpStatus> {
        Arc::clone(&self.status)
    }

    async fn run(&mut self) {
        if self.status.is_cancelled() {
            return;
        }
        match self.log.lock() {
            Ok(mut guard) => guard.push(self.label),
            Err(poisoned) => poisoned.into_inner().push(self.label),
        }
    }
}
