//! Local record store.
//!
//! The pipeline treats the store as a key-ordered collaborator with two
//! query shapes ("most recent by page" and "all records older than X")
//! and a per-item transactional write contract. [`SqliteStore`] is the
//! shipped implementation; the [`RecordStore`] trait keeps the pipeline
//! engine store-agnostic.

mod schema;
mod sqlite;
mod types;

pub use sqlite::SqliteStore;
pub use types::{FeedRecord, parse_release_date};

use chrono::{DateTime, Utc};

/// Record store access error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem error while opening the database.
    #[error("I/O error: {0}")]
    Io(String),

    /// Connection mutex poisoned.
    #[error("lock error: {0}")]
    Lock(String),
}

/// Transactional record store contract.
///
/// Every write or delete commits in its own atomic unit: a caller that
/// stops between calls leaves the store valid, never half-applied.
pub trait RecordStore: Send + Sync {
    /// The record with the highest `page` value, or `None` when empty.
    ///
    /// Ties on `page` are broken arbitrarily by the store.
    fn latest_by_page(&self) -> Result<Option<FeedRecord>, StoreError>;

    /// Insert (or replace) one record in its own transaction.
    fn insert(&self, record: &FeedRecord) -> Result<(), StoreError>;

    /// Delete one record by id in its own transaction.
    fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Records with a release date strictly older than `cutoff`,
    /// ascending by release date.
    fn stale_records(&self, cutoff: DateTime<Utc>) -> Result<Vec<FeedRecord>, StoreError>;

    /// Number of stored records.
    fn count(&self) -> Result<u64, StoreError>;

    /// Whether the store holds no records.
    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.count()? == 0)
    }

    /// Delete every stored record.
    fn delete_all(&self) -> Result<(), StoreError>;
}
