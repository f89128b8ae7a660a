//! Index bootstrap.
//!
//! Recreates the index mappings and, unless asked not to, resets every
//! watermark so the next sync re-indexes everything batch by batch.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::errors::PipelineError;
use movies_indexer_repository::SearchEngineClient;
use movies_indexer_shared::EntityKind;
use movies_indexer_source::RelationalSource;

/// What a bootstrap changed, per entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    pub kind: EntityKind,
    /// Watermarks reset to the epoch, `None` when they were kept.
    pub reset: Option<u64>,
}

pub struct IndexBootstrap {
    source: Arc<dyn RelationalSource>,
    client: Arc<dyn SearchEngineClient>,
}

impl IndexBootstrap {
    pub fn new(source: Arc<dyn RelationalSource>, client: Arc<dyn SearchEngineClient>) -> Self {
        Self { source, client }
    }

    /// Recreate the indices of `kinds`, then reset their watermarks when
    /// `reset_watermarks` is set.
    ///
    /// Watermarks of a kind are only reset after its index was recreated, so a
    /// failed recreation never leaves the database claiming documents that the
    /// index lost.
    #[instrument(skip(self))]
    pub async fn run(
        &self,
        kinds: &[EntityKind],
        reset_watermarks: bool,
    ) -> Result<Vec<BootstrapOutcome>, PipelineError> {
        let mut outcomes = Vec::with_capacity(kinds.len());

        for kind in kinds {
            self.client.recreate_index(*kind).await.map_err(|e| {
                PipelineError::bootstrap(format!("recreating index {}: {}", kind.index_name(), e))
            })?;

            let reset = if reset_watermarks {
                let count = self.source.reset_watermarks(*kind).await.map_err(|e| {
                    PipelineError::bootstrap(format!(
                        "resetting watermarks of {}: {}",
                        kind.table_name(),
                        e
                    ))
                })?;
                info!(entity = %kind, reset = count, "Index recreated, watermarks reset");
                Some(count)
            } else {
                warn!(
                    entity = %kind,
                    "Index recreated, watermarks kept; unchanged rows will not be re-indexed"
                );
                None
            };

            outcomes.push(BootstrapOutcome { kind: *kind, reset });
        }

        Ok(outcomes)
    }
}
