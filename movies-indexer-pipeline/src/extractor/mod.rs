//! Batch extraction and watermark stamping.
//!
//! The extractor materializes one detected batch with the relation aggregates
//! each document needs, and stamps `indexed_at` once the loader confirmed the
//! documents.

mod aggregate;

pub use aggregate::{film_work_rows, genre_rows, person_rows};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::detector::{ChangeDetector, DEFAULT_BATCH_SIZE, DEFAULT_DB_TIMEOUT};
use crate::errors::PipelineError;
use crate::timeout::bounded;
use movies_indexer_shared::{EntityKind, ExtractedRows, StaleEntity};
use movies_indexer_source::RelationalSource;

/// Configuration for the batch extractor.
#[derive(Debug, Clone, Copy)]
pub struct ExtractorConfig {
    /// Maximum number of entities per batch.
    pub batch_size: usize,
    /// Time budget of each database round-trip.
    pub db_timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            db_timeout: DEFAULT_DB_TIMEOUT,
        }
    }
}

/// One extracted batch.
#[derive(Debug, Clone)]
pub struct ExtractedBatch {
    pub kind: EntityKind,
    /// Position of the batch within the run, starting at 1.
    pub number: u64,
    /// Captured just before detection; becomes the `indexed_at` stamp.
    pub extracted_at: DateTime<Utc>,
    /// The detection result the rows were built from.
    pub stale: Vec<StaleEntity>,
    pub rows: ExtractedRows,
}

impl ExtractedBatch {
    /// An empty batch signals that the entity kind is fully synced.
    pub fn is_empty(&self) -> bool {
        self.stale.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Detected ids that will still be stale after stamping at `extracted_at`.
    ///
    /// These carry a last-modified timestamp later than the stamp, typically
    /// because of clock skew on the writer.
    pub fn stale_after_stamp(&self) -> Vec<Uuid> {
        self.stale
            .iter()
            .filter(|s| s.last_modified > self.extracted_at)
            .map(|s| s.id)
            .collect()
    }
}

/// Extracts batches of changed entities and stamps them once loaded.
pub struct BatchExtractor {
    source: Arc<dyn RelationalSource>,
    detector: ChangeDetector,
    db_timeout: Duration,
}

impl BatchExtractor {
    pub fn new(source: Arc<dyn RelationalSource>, config: ExtractorConfig) -> Self {
        let detector = ChangeDetector::with_timeout(source.clone(), config.batch_size, config.db_timeout);
        Self {
            source,
            detector,
            db_timeout: config.db_timeout,
        }
    }

    /// Extract the next batch of `kind`.
    ///
    /// # Arguments
    ///
    /// * `kind` - The entity kind to extract
    /// * `number` - Sequence number of the batch within the run
    /// * `exclude` - Ids already given up on during this run
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractedBatch)` - Possibly empty when nothing is stale
    /// * `Err(PipelineError)` - If a query fails or times out
    #[instrument(skip(self, exclude), fields(entity = %kind, batch = number))]
    pub async fn extract(
        &self,
        kind: EntityKind,
        number: u64,
        exclude: &[Uuid],
    ) -> Result<ExtractedBatch, PipelineError> {
        let extracted_at = Utc::now();
        let stale = self.detector.detect(kind, exclude).await?;

        if stale.is_empty() {
            return Ok(ExtractedBatch {
                kind,
                number,
                extracted_at,
                stale,
                rows: ExtractedRows::empty(kind),
            });
        }

        let ids: Vec<Uuid> = stale.iter().map(|s| s.id).collect();
        let rows = self.load_rows(kind, &ids).await?;

        if rows.len() < ids.len() {
            debug!(
                detected = ids.len(),
                extracted = rows.len(),
                "Some detected rows disappeared before extraction"
            );
        }

        debug!(count = rows.len(), "Extracted batch");

        Ok(ExtractedBatch {
            kind,
            number,
            extracted_at,
            stale,
            rows,
        })
    }

    async fn load_rows(&self, kind: EntityKind, ids: &[Uuid]) -> Result<ExtractedRows, PipelineError> {
        let timeout = self.db_timeout;
        let source = &self.source;

        let rows = match kind {
            EntityKind::FilmWork => {
                let records = bounded(timeout, "film work query", source.film_works(ids)).await?;
                let genres =
                    bounded(timeout, "film genre query", source.genre_links_for_films(ids)).await?;
                let persons =
                    bounded(timeout, "film person query", source.person_links_for_films(ids)).await?;
                ExtractedRows::FilmWorks(film_work_rows(ids, records, &genres, &persons))
            }
            EntityKind::Person => {
                let records = bounded(timeout, "person query", source.persons(ids)).await?;
                let links =
                    bounded(timeout, "person film query", source.person_links_for_persons(ids))
                        .await?;
                ExtractedRows::Persons(person_rows(ids, records, &links))
            }
            EntityKind::Genre => {
                let records = bounded(timeout, "genre query", source.genres(ids)).await?;
                let links =
                    bounded(timeout, "genre film query", source.genre_links_for_genres(ids)).await?;
                ExtractedRows::Genres(genre_rows(ids, records, &links))
            }
        };

        Ok(rows)
    }

    /// Stamp `indexed_at = batch.extracted_at` for the loaded ids of the batch,
    /// in one statement.
    #[instrument(skip(self, batch, ids), fields(entity = %batch.kind, batch = batch.number, count = ids.len()))]
    pub async fn stamp(&self, batch: &ExtractedBatch, ids: &[Uuid]) -> Result<u64, PipelineError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let stamped = bounded(
            self.db_timeout,
            "watermark update",
            self.source.stamp_indexed(batch.kind, ids, batch.extracted_at),
        )
        .await?;

        info!(stamped = stamped, "Stamped indexed entities");
        Ok(stamped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use movies_indexer_shared::{FilmWorkRecord, GenreRecord, PersonJob, PersonRecord};
    use movies_indexer_source::InMemorySource;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap()
    }

    fn extractor(source: Arc<InMemorySource>, batch_size: usize) -> BatchExtractor {
        BatchExtractor::new(
            source,
            ExtractorConfig {
                batch_size,
                ..ExtractorConfig::default()
            },
        )
    }

    fn film(title: &str) -> FilmWorkRecord {
        FilmWorkRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: Some("A film".to_string()),
            creation_date: None,
            imdb_rating: Some(7.5),
            film_rating: None,
            film_type: Some("movie".to_string()),
        }
    }

    #[tokio::test]
    async fn test_empty_source_yields_empty_batch() {
        let source = Arc::new(InMemorySource::new());

        let batch = extractor(source, 10)
            .extract(EntityKind::FilmWork, 1, &[])
            .await
            .unwrap();

        assert!(batch.is_empty());
        assert_eq!(batch.rows, ExtractedRows::empty(EntityKind::FilmWork));
    }

    #[tokio::test]
    async fn test_film_batch_carries_relations() {
        let source = Arc::new(InMemorySource::new());
        let movie = film("Stalker");
        let genre = GenreRecord {
            id: Uuid::new_v4(),
            name: "Sci-Fi".to_string(),
            description: None,
        };
        let actor = PersonRecord {
            id: Uuid::new_v4(),
            full_name: "Alisa Freindlich".to_string(),
        };
        source.put_film_work(movie.clone(), at(1));
        source.put_genre(genre.clone(), at(1));
        source.put_person(actor.clone(), at(1));
        source.link_genre(movie.id, genre.id, at(2));
        source.link_person(movie.id, actor.id, PersonJob::Actor, at(2));

        let batch = extractor(source, 10)
            .extract(EntityKind::FilmWork, 3, &[])
            .await
            .unwrap();

        assert_eq!(batch.number, 3);
        assert_eq!(batch.stale[0].last_modified, at(2));
        let ExtractedRows::FilmWorks(rows) = &batch.rows else {
            panic!("expected film work rows");
        };
        assert_eq!(rows[0].record, movie);
        assert_eq!(rows[0].genres[0].name, "Sci-Fi");
        assert_eq!(rows[0].credits.actors[0].id, actor.id);
    }

    #[tokio::test]
    async fn test_stamp_uses_extraction_time() {
        let source = Arc::new(InMemorySource::new());
        let loaded = film("Loaded");
        let rejected = film("Rejected");
        source.put_film_work(loaded.clone(), at(1));
        source.put_film_work(rejected.clone(), at(2));
        let extractor = extractor(source.clone(), 10);

        let batch = extractor.extract(EntityKind::FilmWork, 1, &[]).await.unwrap();
        let stamped = extractor.stamp(&batch, &[loaded.id]).await.unwrap();

        assert_eq!(stamped, 1);
        assert_eq!(
            source.indexed_at(EntityKind::FilmWork, loaded.id),
            Some(batch.extracted_at)
        );
        let remaining = extractor.extract(EntityKind::FilmWork, 2, &[]).await.unwrap();
        assert_eq!(remaining.rows.ids(), vec![rejected.id]);
    }

    #[tokio::test]
    async fn test_edit_during_flight_stays_stale() {
        let source = Arc::new(InMemorySource::new());
        let movie = film("Mirror");
        source.put_film_work(movie.clone(), at(1));
        let extractor = extractor(source.clone(), 10);

        let batch = extractor.extract(EntityKind::FilmWork, 1, &[]).await.unwrap();
        // Edited after the batch was extracted, before it was stamped.
        source.touch(
            EntityKind::FilmWork,
            movie.id,
            batch.extracted_at + chrono::Duration::milliseconds(5),
        );
        extractor.stamp(&batch, &[movie.id]).await.unwrap();

        let next = extractor.extract(EntityKind::FilmWork, 2, &[]).await.unwrap();
        assert_eq!(next.rows.ids(), vec![movie.id]);
    }

    #[tokio::test]
    async fn test_future_dated_rows_are_reported() {
        let source = Arc::new(InMemorySource::new());
        let movie = film("Tomorrow");
        source.put_film_work(movie.clone(), Utc::now() + chrono::Duration::days(1));

        let batch = extractor(source, 10)
            .extract(EntityKind::FilmWork, 1, &[])
            .await
            .unwrap();

        assert_eq!(batch.stale_after_stamp(), vec![movie.id]);
    }

    #[tokio::test]
    async fn test_stamp_nothing_is_a_no_op() {
        let source = Arc::new(InMemorySource::new());
        let extractor = extractor(source, 10);
        let batch = extractor.extract(EntityKind::Genre, 1, &[]).await.unwrap();

        assert_eq!(extractor.stamp(&batch, &[]).await.unwrap(), 0);
    }
}
