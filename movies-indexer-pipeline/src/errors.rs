//! Error types for the movies indexer pipeline.

use std::time::Duration;

use movies_indexer_repository::SearchError;
use movies_indexer_source::SourceError;
use thiserror::Error;

/// Errors that abort an entity pipeline run.
///
/// Document-level problems (validation failures, per-document index
/// rejections) are not errors: they are reported and the batch continues.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the relational source.
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// Non-transient error from the search engine.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    /// Transient search engine failures persisted through every attempt.
    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: SearchError,
    },

    /// A database round-trip exceeded its time budget.
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Index bootstrap failed.
    #[error("Bootstrap error: {0}")]
    BootstrapError(String),

    /// An entity pipeline task panicked or was aborted.
    #[error("Task error: {0}")]
    TaskError(String),

    /// The run was interrupted by the shutdown signal.
    #[error("Pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Create a bootstrap error.
    pub fn bootstrap(msg: impl Into<String>) -> Self {
        Self::BootstrapError(msg.into())
    }

    /// Create a task error.
    pub fn task(msg: impl Into<String>) -> Self {
        Self::TaskError(msg.into())
    }

    /// Whether the error was caused by the shutdown signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
