//! Frontier lookup: the most-recently-paged record known to the store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::operation::{OpStatus, Operation};
use super::slot::Slot;
use crate::store::{FeedRecord, RecordStore};

/// Reads the store for the highest-page record, the basis for computing
/// the next page to fetch.
pub struct FetchFrontierOperation {
    store: Arc<dyn RecordStore>,
    output: Arc<Slot<FeedRecord>>,
    status: Arc<OpStatus>,
}

impl FetchFrontierOperation {
    /// Create the operation writing its result into `output`.
    pub fn new(
        store: Arc<dyn RecordStore>,
        output: Arc<Slot<FeedRecord>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            output,
            status: OpStatus::new("fetch_frontier", cancel),
        }
    }
}

#[async_trait]
impl Operation for FetchFrontierOperation {
    fn status(&self) -> Arc<OpStatus> {
        Arc::clone(&self.status)
    }

    async fn run(&mut self) {
        if self.status.is_cancelled() {
            return;
        }

        match self.store.latest_by_page() {
            Ok(Some(record)) => {
                debug!(page = record.page, id = record.id, "frontier found");
                self.output.put(record);
            }
            Ok(None) => {
                debug!("store empty, no frontier");
            }
            Err(e) => {
                // A local read failure must not block the network
                // refresh: fail open, treated as "no prior state".
                warn!(error = %e, "frontier query failed, failing open");
            }
        }
    }
}
