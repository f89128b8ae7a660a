//! # Movies Indexer Pipeline
//!
//! This crate provides the pipeline components that keep the search indices in
//! sync with the relational catalog of film works, persons and genres.
//!
//! ## Architecture
//!
//! Each entity kind runs its own pipeline, one batch at a time:
//!
//! 1. **Detector**: Finds entities changed since they were last indexed
//! 2. **Extractor**: Loads a batch with its relation aggregates
//! 3. **Transformer**: Turns rows into search documents
//! 4. **Loader**: Bulk-upserts documents, retrying transient failures
//! 5. **Extractor** again: Stamps the loaded entities as indexed
//!
//! The **Orchestrator** runs the pipelines until every kind is drained, and
//! **Bootstrap** recreates indices for a full resync.

pub mod bootstrap;
pub mod detector;
pub mod errors;
pub mod extractor;
pub mod loader;
pub mod orchestrator;
pub mod shutdown;
mod timeout;
pub mod transformer;

pub use bootstrap::{BootstrapOutcome, IndexBootstrap};
pub use detector::ChangeDetector;
pub use errors::PipelineError;
pub use extractor::{BatchExtractor, ExtractedBatch, ExtractorConfig};
pub use loader::{LoadReport, LoaderConfig, Rejection, SearchLoader};
pub use orchestrator::{
    EntityOutcome, EntityPipeline, Orchestrator, OrchestratorConfig, PipelineState, PipelineStats,
    SyncReport,
};
pub use shutdown::{Shutdown, ShutdownHandle};
pub use transformer::{DocumentTransformer, TransformOutput, ValidationError};
