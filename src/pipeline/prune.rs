//! Deletion of stale records.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::operation::{OpStatus, Operation};
use crate::store::RecordStore;

/// Deletes records with a release date older than the cutoff, one per
/// atomic unit, checking cancellation between deletions.
pub struct PruneOperation {
    store: Arc<dyn RecordStore>,
    cutoff: DateTime<Utc>,
    status: Arc<OpStatus>,
}

impl PruneOperation {
    /// Create the operation with a staleness cutoff.
    pub fn new(store: Arc<dyn RecordStore>, cutoff: DateTime<Utc>, cancel: CancellationToken) -> Self {
        Self {
            store,
            cutoff,
            status: OpStatus::new("prune", cancel),
        }
    }
}

#[async_trait]
impl Operation for PruneOperation {
    fn status(&self) -> Arc<OpStatus> {
        Arc::clone(&self.status)
    }

    async fn run(&mut self) {
        if self.status.is_cancelled() {
            return;
        }

        let stale = match self.store.stale_records(self.cutoff) {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "stale query failed, prune aborted");
                self.status.cancel();
                return;
            }
        };

        info!(count = stale.len(), cutoff = %self.cutoff, "pruning stale records");
        for record in stale {
            debug!(id = record.id, release_date = %record.release_date, "deleting stale record");

            if let Err(e) = self.store.delete(record.id) {
                error!(id = record.id, error = %e, "delete failed, stopping prune");
                self.status.cancel();
                break;
            }

            if self.status.is_cancelled() {
                debug!("prune cancelled between deletions");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::spawn_serial;
    use crate::store::{FeedRecord, SqliteStore};

    fn day(n: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(n * 86_400, 0).expect("timestamp")
    }

    fn seeded_store(release_days: &[i64]) -> Arc<SqliteStore> {
        let store = SqliteStore::open_in_memory().expect("open");
        for (i, days) in release_days.iter().enumerate() {
            store
                .insert(&FeedRecord {
                    id: i as i64 + 1,
                    title: String::new(),
                    overview: String::new(),
                    poster_ref: None,
                    release_date: day(*days),
                    popularity: 0.0,
                    page: 1,
                })
                .expect("insert");
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn deletes_only_records_older_than_the_cutoff() {
        let store = seeded_store(&[1, 5, 10]);
        let op = PruneOperation::new(
            store.clone(),
            day(6),
            CancellationToken::new(),
        );
        let status = op.status();
        spawn_serial(vec![Box::new(op)]).await.expect("executor");

        assert_eq!(store.count().expect("count"), 1);
        assert!(!status.is_cancelled());
    }

    #[tokio::test]
    async fn pre_cancelled_prune_deletes_nothing() {
        let store = seeded_store(&[1, 2]);
        let token = CancellationToken::new();
        token.cancel();
        let op = PruneOperation::new(store.clone(), day(10), token);
        spawn_serial(vec![Box::new(op)]).await.expect("executor");

        assert_eq!(store.count().expect("count"), 2);
    }

    #[tokio::test]
    async fn nothing_stale_is_a_successful_no_op() {
        let store = seeded_store(&[8, 9]);
        let op = PruneOperation::new(
            store.clone(),
            day(3),
            CancellationToken::new(),
        );
        let status = op.status();
        spawn_serial(vec![Box::new(op)]).await.expect("executor");

        assert_eq!(store.count().expect("count"), 2);
        assert!(status.is_finished());
        assert!(!status.is_cancelled());
    }
}
