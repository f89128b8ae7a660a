//! Transformer module for the movies indexer pipeline.
//!
//! Turns extracted rows into search documents.

mod document_transformer;

pub use document_transformer::{DocumentTransformer, TransformOutput, ValidationError};
