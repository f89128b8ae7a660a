//! Per-entity pipeline.
//!
//! Drives one entity kind through extract, transform, load and stamp until an
//! empty batch comes back.

use std::fmt;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::extractor::{BatchExtractor, ExtractedBatch};
use crate::loader::{LoadReport, SearchLoader};
use crate::shutdown::Shutdown;
use crate::transformer::{DocumentTransformer, TransformOutput};
use movies_indexer_shared::EntityKind;

/// Stage an entity pipeline is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Extracting,
    Transforming,
    Loading,
    Stamping,
}

impl PipelineState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Extracting)
                | (Extracting, Transforming)
                | (Extracting, Idle)
                | (Transforming, Loading)
                | (Loading, Stamping)
                | (Stamping, Extracting)
                | (Stamping, Idle)
                // Failures abort from any stage without stamping.
                | (_, Idle)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Extracting => "extracting",
            PipelineState::Transforming => "transforming",
            PipelineState::Loading => "loading",
            PipelineState::Stamping => "stamping",
        };
        f.write_str(name)
    }
}

/// Counters of one entity pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Non-empty batches processed.
    pub batches: u64,
    pub extracted: u64,
    /// Rows left out by validation.
    pub skipped: u64,
    /// Documents accepted by the index.
    pub loaded: u64,
    /// Documents refused by the index.
    pub rejected: u64,
    /// Watermarks advanced.
    pub stamped: u64,
}

/// Runs one entity kind to full drain.
///
/// The target index is ensured first, with the loader's retry policy, so an
/// unreachable index fails this entity only. Exactly one batch is in flight:
/// it is extracted, transformed, loaded and stamped before the next one is
/// detected. Ids skipped or rejected during the run are excluded from later
/// detections so the run terminates; their watermarks are untouched and the
/// next run retries them.
pub struct EntityPipeline {
    kind: EntityKind,
    extractor: BatchExtractor,
    transformer: DocumentTransformer,
    loader: SearchLoader,
    shutdown: Shutdown,
    state: PipelineState,
    excluded: Vec<Uuid>,
    stats: PipelineStats,
}

impl EntityPipeline {
    pub fn new(
        kind: EntityKind,
        extractor: BatchExtractor,
        loader: SearchLoader,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            kind,
            extractor,
            transformer: DocumentTransformer::new(),
            loader,
            shutdown,
            state: PipelineState::Idle,
            excluded: Vec::new(),
            stats: PipelineStats::default(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn enter(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(entity = %self.kind, from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
    }

    /// Run until no stale entity is left, or until the first fatal error.
    #[instrument(skip(self), fields(entity = %self.kind))]
    pub async fn run(mut self) -> Result<PipelineStats, PipelineError> {
        info!("Starting entity pipeline");

        if let Err(e) = self.loader.ensure_index(self.kind, &mut self.shutdown).await {
            error!(index = self.kind.index_name(), error = %e, "Search index unavailable");
            return Err(e);
        }

        let mut number = 0;

        loop {
            if self.shutdown.is_shutdown() {
                warn!(batches = self.stats.batches, "Pipeline stopped by shutdown signal");
                self.enter(PipelineState::Idle);
                return Err(PipelineError::Cancelled);
            }

            number += 1;
            match self.run_batch(number).await {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => {
                    error!(batch = number, error = %e, "Entity pipeline aborted");
                    self.enter(PipelineState::Idle);
                    return Err(e);
                }
            }
        }

        info!(
            batches = self.stats.batches,
            loaded = self.stats.loaded,
            skipped = self.stats.skipped,
            rejected = self.stats.rejected,
            stamped = self.stats.stamped,
            "Entity pipeline drained"
        );
        Ok(self.stats)
    }

    /// Process one batch. Returns `false` once the batch came back empty.
    async fn run_batch(&mut self, number: u64) -> Result<bool, PipelineError> {
        self.enter(PipelineState::Extracting);
        let batch = self.extractor.extract(self.kind, number, &self.excluded).await?;

        if batch.is_empty() {
            debug!(batch = number, "Empty batch, nothing left to index");
            self.enter(PipelineState::Idle);
            return Ok(false);
        }

        self.enter(PipelineState::Transforming);
        let output = self.transformer.transform(&batch.rows);

        self.enter(PipelineState::Loading);
        let report = self.loader.load(&output.documents, &mut self.shutdown).await?;

        self.enter(PipelineState::Stamping);
        let stamped = self.extractor.stamp(&batch, &report.indexed).await?;

        self.record(&batch, &output, &report, stamped);
        Ok(true)
    }

    fn record(
        &mut self,
        batch: &ExtractedBatch,
        output: &TransformOutput,
        report: &LoadReport,
        stamped: u64,
    ) {
        self.excluded.extend(output.skipped_ids());
        self.excluded.extend(report.rejected_ids());
        // Stamped but still stale: retry them on the next run, not this one.
        self.excluded.extend(batch.stale_after_stamp());

        self.stats.batches += 1;
        self.stats.extracted += batch.len() as u64;
        self.stats.skipped += output.skipped.len() as u64;
        self.stats.loaded += report.indexed.len() as u64;
        self.stats.rejected += report.rejected.len() as u64;
        self.stats.stamped += stamped;

        info!(
            batch = batch.number,
            extracted = batch.len(),
            loaded = report.indexed.len(),
            skipped = output.skipped.len(),
            rejected = report.rejected.len(),
            stamped = stamped,
            "Batch complete"
        );
    }
}
