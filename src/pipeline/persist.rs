//! Write-back of a downloaded page into the record store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::operation::{OpStatus, Operation};
use super::slot::Slot;
use crate::feed::FeedPage;
use crate::store::RecordStore;

/// Commits downloaded records one at a time, each in its own atomic
/// unit, checking cancellation between commits.
///
/// Already-committed records are never rolled back: a mid-run
/// cancellation leaves the store valid, just incomplete. An empty input
/// slot means upstream failed; the operation then performs no writes.
pub struct PersistOperation {
    store: Arc<dyn RecordStore>,
    input: Arc<Slot<FeedPage>>,
    status: Arc<OpStatus>,
}

impl PersistOperation {
    /// Create the operation reading its page from `input`.
    pub fn new(
        store: Arc<dyn RecordStore>,
        input: Arc<Slot<FeedPage>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            input,
            status: OpStatus::new("persist", cancel),
        }
    }
}

#[async_trait]
impl Operation for PersistOperation {
    fn status(&self) -> Arc<OpStatus> {
        Arc::clone(&self.status)
    }

    async fn run(&mut self) {
        let Some(page) = self.input.take() else {
            return;
        };
        if self.status.is_cancelled() {
            return;
        }

        for entry in page.entries {
            let record = entry.into_record(page.page_number);
            debug!(id = record.id, title = %record.title, "persisting record");

            if let Err(e) = self.store.insert(&record) {
                // Stop early without retry; prior commits are retained
                // and the run is reported failed.
                error!(id = record.id, error = %e, "commit failed, stopping persist");
                self.status.cancel();
                break;
            }

            if self.status.is_cancelled() {
                debug!("persist cancelled between commits");
                break;
            }
        }
    }
}
