//! # Movies Indexer Shared
//!
//! Shared types for the movies search indexer: entity kinds, rows read from the
//! relational source, aggregated rows handed to the transformer, and the documents
//! written to the search index.

pub mod document;
pub mod entity;
pub mod record;
pub mod row;

pub use document::{
    GenreDocument, MovieDocument, NamedRef, PersonDocument, SearchDocument,
};
pub use entity::{EntityKind, ParseEntityKindError, ParsePersonJobError, PersonJob, WATERMARK_EPOCH};
pub use record::{FilmWorkRecord, GenreLink, GenreRecord, PersonLink, PersonRecord, StaleEntity};
pub use row::{Credits, ExtractedRows, FilmWorkRow, GenreRow, PersonRow};
