//! # Movies Indexer Source
//!
//! Access to the relational system-of-record. The [`RelationalSource`] trait
//! covers everything the pipeline reads (stale ids, records, relation links) and
//! the single field it writes (`indexed_at`).
//!
//! Two implementations are provided:
//!
//! - [`PostgresSource`]: the production backend, built on a `sqlx` connection pool
//! - [`InMemorySource`]: an in-process catalog with the same staleness semantics

pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;

pub use errors::SourceError;
pub use interfaces::RelationalSource;
pub use memory::InMemorySource;
pub use postgres::{PostgresConfig, PostgresSource};
