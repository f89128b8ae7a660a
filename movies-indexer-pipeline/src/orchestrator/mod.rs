//! Orchestrator module for the movies indexer pipeline.
//!
//! Coordinates the per-entity pipelines of a sync run.

mod entity_pipeline;

pub use entity_pipeline::{EntityPipeline, PipelineState, PipelineStats};

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::detector::{DEFAULT_BATCH_SIZE, DEFAULT_DB_TIMEOUT};
use crate::errors::PipelineError;
use crate::extractor::{BatchExtractor, ExtractorConfig};
use crate::loader::{LoaderConfig, SearchLoader};
use crate::shutdown::ShutdownHandle;
use movies_indexer_repository::SearchEngineClient;
use movies_indexer_shared::EntityKind;
use movies_indexer_source::RelationalSource;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Entity kinds to sync, in order.
    pub entities: Vec<EntityKind>,
    /// Maximum number of entities per batch.
    pub batch_size: usize,
    /// Run the entity pipelines concurrently instead of one after another.
    pub concurrent: bool,
    /// Time budget of each database round-trip.
    pub db_timeout: Duration,
    pub loader: LoaderConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            entities: EntityKind::ALL.to_vec(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrent: false,
            db_timeout: DEFAULT_DB_TIMEOUT,
            loader: LoaderConfig::default(),
        }
    }
}

/// Outcome of one entity pipeline.
#[derive(Debug)]
pub struct EntityOutcome {
    pub kind: EntityKind,
    pub result: Result<PipelineStats, PipelineError>,
}

/// Outcome of a sync run, one entry per configured entity kind.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<EntityOutcome>,
}

impl SyncReport {
    /// Whether every entity pipeline drained.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (EntityKind, &PipelineError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.kind, e)))
    }

    /// Stats of a drained pipeline.
    pub fn stats(&self, kind: EntityKind) -> Option<PipelineStats> {
        self.outcomes
            .iter()
            .find(|o| o.kind == kind)
            .and_then(|o| o.result.as_ref().ok().copied())
    }

    /// Sum of the stats of every drained pipeline.
    pub fn totals(&self) -> PipelineStats {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .fold(PipelineStats::default(), |mut acc, s| {
                acc.batches += s.batches;
                acc.extracted += s.extracted;
                acc.skipped += s.skipped;
                acc.loaded += s.loaded;
                acc.rejected += s.rejected;
                acc.stamped += s.stamped;
                acc
            })
    }
}

/// Orchestrator that coordinates the pipeline components.
///
/// The orchestrator:
/// - Runs one pipeline per entity kind to full drain, each ensuring its index
///   first
/// - Keeps running the remaining pipelines when one fails
/// - Broadcasts the shutdown signal to every pipeline
pub struct Orchestrator {
    source: Arc<dyn RelationalSource>,
    client: Arc<dyn SearchEngineClient>,
    config: OrchestratorConfig,
    shutdown: ShutdownHandle,
}

impl Orchestrator {
    /// Create a new orchestrator with the default configuration.
    pub fn new(source: Arc<dyn RelationalSource>, client: Arc<dyn SearchEngineClient>) -> Self {
        Self::with_config(source, client, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        source: Arc<dyn RelationalSource>,
        client: Arc<dyn SearchEngineClient>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            source,
            client,
            config,
            shutdown: ShutdownHandle::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// A handle that triggers shutdown, e.g. from a signal handler.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown.signal();
    }

    fn loader(&self) -> SearchLoader {
        SearchLoader::with_config(self.client.clone(), self.config.loader)
    }

    /// Wait for the search engine to answer a health check, retrying
    /// transient failures with the loader's backoff policy.
    pub async fn wait_for_search_engine(&self) -> Result<(), PipelineError> {
        let mut shutdown = self.shutdown.subscribe();
        self.loader().wait_until_healthy(&mut shutdown).await
    }

    /// Build the pipeline of one entity kind.
    pub fn pipeline(&self, kind: EntityKind) -> EntityPipeline {
        let extractor = BatchExtractor::new(
            self.source.clone(),
            ExtractorConfig {
                batch_size: self.config.batch_size,
                db_timeout: self.config.db_timeout,
            },
        );
        EntityPipeline::new(kind, extractor, self.loader(), self.shutdown.subscribe())
    }

    /// Run a full sync.
    ///
    /// Failures are per entity and reported in the returned [`SyncReport`];
    /// check [`SyncReport::is_success`].
    #[instrument(skip(self), fields(entities = ?self.config.entities, concurrent = self.config.concurrent))]
    pub async fn run(&self) -> SyncReport {
        info!("Starting sync run");

        let pipelines: Vec<EntityPipeline> = self
            .config
            .entities
            .iter()
            .map(|kind| self.pipeline(*kind))
            .collect();

        let report = if self.config.concurrent {
            Self::run_concurrent(pipelines).await
        } else {
            Self::run_sequential(pipelines).await
        };

        for (kind, e) in report.failures() {
            error!(entity = %kind, error = %e, "Entity pipeline failed");
        }

        let totals = report.totals();
        info!(
            success = report.is_success(),
            batches = totals.batches,
            loaded = totals.loaded,
            skipped = totals.skipped,
            rejected = totals.rejected,
            "Sync run complete"
        );

        report
    }

    async fn run_sequential(pipelines: Vec<EntityPipeline>) -> SyncReport {
        let mut report = SyncReport::default();

        for pipeline in pipelines {
            let kind = pipeline.kind();
            let result = pipeline.run().await;
            report.outcomes.push(EntityOutcome { kind, result });
        }

        report
    }

    async fn run_concurrent(pipelines: Vec<EntityPipeline>) -> SyncReport {
        let kinds: Vec<EntityKind> = pipelines.iter().map(EntityPipeline::kind).collect();
        let handles = pipelines
            .into_iter()
            .map(|pipeline| tokio::spawn(pipeline.run()));

        let joined = futures::future::join_all(handles).await;

        let outcomes = kinds
            .into_iter()
            .zip(joined)
            .map(|(kind, joined)| EntityOutcome {
                kind,
                result: joined.unwrap_or_else(|e| Err(PipelineError::task(e.to_string()))),
            })
            .collect();

        SyncReport { outcomes }
    }
}
