//! Error types for the sync engine.

/// Top-level error type for the feed synchronization engine.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Record store error (open, query, commit).
    #[error("store error: {0}")]
    Store(String),

    /// Remote feed error (request, decode).
    #[error("feed error: {0}")]
    Feed(String),

    /// Pipeline construction or execution error.
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Scheduler error (trigger handling, state persistence).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SyncError>;
