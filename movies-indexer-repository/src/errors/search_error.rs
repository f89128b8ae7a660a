//! Search error types.
//!
//! This module defines the error types that can occur during search engine
//! operations, and which of them are worth retrying.

use thiserror::Error;

/// Errors that can occur during search engine operations.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// Failed to establish connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within the transport timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The engine answered but is temporarily unable to serve (429, 502, 503, 504).
    #[error("Search engine unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },

    /// The bulk request as a whole was refused.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to create or delete an index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse response from search engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search engine.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an unavailable error.
    pub fn unavailable(status: u16, msg: impl Into<String>) -> Self {
        Self::Unavailable {
            status,
            message: msg.into(),
        }
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Whether the failure is transient and the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::ConnectionError(_)
            | SearchError::Timeout(_)
            | SearchError::Unavailable { .. } => true,
            SearchError::BulkIndexError(_)
            | SearchError::IndexCreationError(_)
            | SearchError::ParseError(_)
            | SearchError::SerializationError(_) => false,
        }
    }

    /// Map an HTTP status of a failed response to an error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            429 | 502 | 503 | 504 => Self::unavailable(status, body),
            _ => Self::bulk_index(format!("status {}: {}", status, body.into())),
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
