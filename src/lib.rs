//! Cinefeed: background synchronization engine for a paged movie feed.
//!
//! The crate keeps a local SQLite record store in step with a remote
//! paged feed using two independent pipelines:
//!
//! - **Refresh**: FetchFrontier → RelayPageNumber → Download →
//!   RelayPageResult → Persist. Computes the next page to fetch from
//!   locally stored state, downloads it, and commits each record in its
//!   own transaction.
//! - **Prune**: a single operation that deletes records older than the
//!   retention window, one transaction per record, throttled to at most
//!   once per prune interval.
//!
//! # Architecture
//!
//! Pipelines are dependency graphs of cancellable operations executed
//! one at a time on a spawned serial task. Data moves between nodes via
//! typed slots; relay nodes either wire one node's output into the next
//! node's input, or cancel downstream when upstream failed. An external
//! one-shot deadline signal (a `CancellationToken`) can cancel a whole
//! run at any time; the scheduler reports exactly one success/failure
//! outcome per run.

pub mod config;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod scheduler;
pub mod store;

#[cfg(test)]
pub mod test_utils;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use feed::{FeedError, FeedPage, RemoteFeed};
pub use pipeline::{OpStatus, Operation, PipelineRun};
pub use scheduler::{RunKind, RunReport, Scheduler, StateFile, SyncRunner};
pub use store::{FeedRecord, RecordStore, SqliteStore};
