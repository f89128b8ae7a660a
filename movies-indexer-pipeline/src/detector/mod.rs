//! Change detection.
//!
//! Finds the entities whose computed last-modified timestamp is newer than
//! their `indexed_at` watermark. Detection only reads.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::timeout::bounded;
use movies_indexer_shared::{EntityKind, StaleEntity};
use movies_indexer_source::RelationalSource;

/// Default number of entities per detection.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default time budget of a single database round-trip.
pub const DEFAULT_DB_TIMEOUT: Duration = Duration::from_secs(30);

/// Detects stale entities, oldest first, at most `batch_size` at a time.
pub struct ChangeDetector {
    source: Arc<dyn RelationalSource>,
    batch_size: usize,
    db_timeout: Duration,
}

impl ChangeDetector {
    /// Create a detector with the default database timeout.
    pub fn new(source: Arc<dyn RelationalSource>, batch_size: usize) -> Self {
        Self::with_timeout(source, batch_size, DEFAULT_DB_TIMEOUT)
    }

    pub fn with_timeout(
        source: Arc<dyn RelationalSource>,
        batch_size: usize,
        db_timeout: Duration,
    ) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
            db_timeout,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Detect the next stale entities of `kind`.
    ///
    /// Ids in `exclude` are left out even when stale; the orchestrator passes
    /// the ids it already gave up on during the current run.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<StaleEntity>)` - Ascending by last-modified, ties by id; empty
    ///   when nothing is left to index
    /// * `Err(PipelineError)` - If the query fails or times out
    #[instrument(skip(self, exclude), fields(entity = %kind, excluded = exclude.len()))]
    pub async fn detect(
        &self,
        kind: EntityKind,
        exclude: &[Uuid],
    ) -> Result<Vec<StaleEntity>, PipelineError> {
        let stale = bounded(
            self.db_timeout,
            "stale entity query",
            self.source.stale_entities(kind, self.batch_size, exclude),
        )
        .await?;

        debug!(count = stale.len(), "Detected stale entities");
        Ok(stale)
    }
}
