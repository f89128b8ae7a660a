//! Error types for the relational source.

use thiserror::Error;

/// Errors that can occur while reading from or stamping the relational source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Failed to connect to the database.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row held a value the pipeline cannot interpret.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl SourceError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }
}
