//! Error types for the movies indexer repository.

mod search_error;

pub use search_error::SearchError;
