//! The operation pipeline engine.
//!
//! A pipeline run is a small dependency graph of cancellable operations
//! submitted to a serial execution context (max concurrency 1). Data
//! moves between nodes through typed [`Slot`]s; relay nodes wire one
//! node's output into the next node's input, or cancel downstream when
//! upstream failed, so a node never executes on failed input.
//!
//! Ordering across a graph is guaranteed purely by submission order
//! plus serial execution — no node ever observes a partially finished
//! dependency.

mod download;
mod fetch_frontier;
mod graph;
mod operation;
mod persist;
mod prune;
mod slot;

pub use download::DownloadOperation;
pub use fetch_frontier::FetchFrontierOperation;
pub use graph::{PipelineRun, RunningPipeline};
pub use operation::{OpStatus, Operation};
pub use persist::PersistOperation;
pub use prune::PruneOperation;
pub use slot::Slot;

pub(crate) use operation::spawn_serial;
