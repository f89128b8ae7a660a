//! PostgreSQL implementation of the relational source.
//!
//! Tables are addressed unqualified; the configured schema is put on the
//! connection's `search_path`.

mod client;
mod queries;

pub use client::{PostgresConfig, PostgresSource};
