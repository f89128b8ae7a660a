//! Relational source trait definition.
//!
//! This module defines the abstract interface the pipeline uses to detect,
//! extract and stamp entities, so the pipeline can run against PostgreSQL in
//! production and against an in-memory catalog in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::SourceError;
use movies_indexer_shared::{
    EntityKind, FilmWorkRecord, GenreLink, GenreRecord, PersonLink, PersonRecord, StaleEntity,
};

/// Abstract interface over the system-of-record.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; pipelines for different entity kinds
/// share one source concurrently.
///
/// # Writes
///
/// `stamp_indexed` and `reset_watermarks` are the only writes, and both touch
/// the `indexed_at` column exclusively.
#[async_trait]
pub trait RelationalSource: Send + Sync {
    /// Find entities whose computed last-modified timestamp is newer than their
    /// `indexed_at` watermark.
    ///
    /// # Arguments
    ///
    /// * `kind` - The entity kind to inspect
    /// * `limit` - Maximum number of ids to return
    /// * `exclude` - Ids to leave out even if stale
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<StaleEntity>)` - Oldest stale first, ties ordered by id
    /// * `Err(SourceError)` - If the query fails
    async fn stale_entities(
        &self,
        kind: EntityKind,
        limit: usize,
        exclude: &[Uuid],
    ) -> Result<Vec<StaleEntity>, SourceError>;

    /// Load `film_work` rows by id. Missing ids are silently absent.
    async fn film_works(&self, ids: &[Uuid]) -> Result<Vec<FilmWorkRecord>, SourceError>;

    /// Load genre links of the given film works.
    async fn genre_links_for_films(&self, film_ids: &[Uuid]) -> Result<Vec<GenreLink>, SourceError>;

    /// Load person links of the given film works.
    async fn person_links_for_films(&self, film_ids: &[Uuid]) -> Result<Vec<PersonLink>, SourceError>;

    /// Load `person` rows by id.
    async fn persons(&self, ids: &[Uuid]) -> Result<Vec<PersonRecord>, SourceError>;

    /// Load the film work links of the given persons.
    async fn person_links_for_persons(
        &self,
        person_ids: &[Uuid],
    ) -> Result<Vec<PersonLink>, SourceError>;

    /// Load `genre` rows by id.
    async fn genres(&self, ids: &[Uuid]) -> Result<Vec<GenreRecord>, SourceError>;

    /// Load the film work links of the given genres.
    async fn genre_links_for_genres(
        &self,
        genre_ids: &[Uuid],
    ) -> Result<Vec<GenreLink>, SourceError>;

    /// Advance `indexed_at` to `indexed_at` for every given id, in one atomic
    /// statement. Watermarks never move backwards.
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Number of rows updated
    /// * `Err(SourceError)` - If the update fails; no row is stamped
    async fn stamp_indexed(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
        indexed_at: DateTime<Utc>,
    ) -> Result<u64, SourceError>;

    /// Reset every watermark of the given kind to the epoch, forcing a full
    /// resync on the next run.
    async fn reset_watermarks(&self, kind: EntityKind) -> Result<u64, SourceError>;
}
