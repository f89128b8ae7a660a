//! # Movies Indexer
//!
//! Main library for the movies search indexer.
//!
//! This crate provides the configuration, dependency wiring and logging setup
//! for running the sync pipeline and the index bootstrap.

pub mod config;
pub mod telemetry;

pub use config::{Dependencies, LogFormat, Settings};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] movies_indexer_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] movies_indexer_repository::SearchError),

    /// Relational source error.
    #[error("Source error: {0}")]
    SourceError(#[from] movies_indexer_source::SourceError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
