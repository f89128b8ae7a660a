//! Loader module for the movies indexer pipeline.
//!
//! Sends documents to the search index in one bulk request, retrying
//! transient failures with exponential backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::shutdown::Shutdown;
use movies_indexer_repository::{BulkSummary, SearchEngineClient, SearchError};
use movies_indexer_shared::{EntityKind, SearchDocument};

/// Configuration for the search loader.
#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    /// Maximum number of bulk attempts, the first one included.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 10_000,
        }
    }
}

/// A document the search index refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub entity_id: Uuid,
    pub reason: String,
}

/// Outcome of loading one batch.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Ids of the documents the index accepted.
    pub indexed: Vec<Uuid>,
    /// Documents the index refused.
    pub rejected: Vec<Rejection>,
    /// Bulk attempts made, 0 when there was nothing to send.
    pub attempts: u32,
}

impl LoadReport {
    pub fn rejected_ids(&self) -> Vec<Uuid> {
        self.rejected.iter().map(|r| r.entity_id).collect()
    }
}

/// Loader that indexes documents into the search engine.
///
/// The loader is responsible for:
/// - Making sure the target index exists before the first batch
/// - Sending a batch as one bulk request
/// - Retrying transient failures with capped exponential backoff
/// - Splitting the outcome into accepted and rejected documents
pub struct SearchLoader {
    client: Arc<dyn SearchEngineClient>,
    config: LoaderConfig,
}

impl SearchLoader {
    /// Create a new search loader with the given client.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self::with_config(client, LoaderConfig::default())
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(client: Arc<dyn SearchEngineClient>, config: LoaderConfig) -> Self {
        Self { client, config }
    }

    /// Load a batch of documents.
    ///
    /// # Returns
    ///
    /// * `Ok(LoadReport)` - The index answered; rejected documents are listed
    /// * `Err(PipelineError::RetriesExhausted)` - Every attempt failed transiently
    /// * `Err(PipelineError::SearchError)` - A non-transient failure
    /// * `Err(PipelineError::Cancelled)` - Shutdown was signalled first
    #[instrument(skip(self, documents, shutdown), fields(count = documents.len()))]
    pub async fn load(
        &self,
        documents: &[SearchDocument],
        shutdown: &mut Shutdown,
    ) -> Result<LoadReport, PipelineError> {
        if documents.is_empty() {
            return Ok(LoadReport::default());
        }

        let (summary, attempts) = self.bulk_upsert_with_retry(documents, shutdown).await?;
        let report = Self::report(documents, summary, attempts)?;

        for rejection in &report.rejected {
            warn!(
                entity_id = %rejection.entity_id,
                reason = %rejection.reason,
                "Document rejected by search index"
            );
        }

        info!(
            indexed = report.indexed.len(),
            rejected = report.rejected.len(),
            attempts = attempts,
            "Loaded documents"
        );

        Ok(report)
    }

    /// Make sure the index of `kind` exists, retrying transient failures.
    #[instrument(skip(self, shutdown), fields(entity = %kind))]
    pub async fn ensure_index(
        &self,
        kind: EntityKind,
        shutdown: &mut Shutdown,
    ) -> Result<(), PipelineError> {
        self.with_retry("ensure_index", shutdown, || {
            self.client.ensure_index_exists(kind)
        })
        .await?;
        Ok(())
    }

    /// Wait until the cluster reports a usable health status.
    ///
    /// A red cluster counts as unavailable and is retried like a refused
    /// connection.
    #[instrument(skip(self, shutdown))]
    pub async fn wait_until_healthy(&self, shutdown: &mut Shutdown) -> Result<(), PipelineError> {
        self.with_retry("health_check", shutdown, || async {
            match self.client.health_check().await {
                Ok(true) => Ok(()),
                Ok(false) => Err(SearchError::unavailable(503, "cluster health is red")),
                Err(e) => Err(e),
            }
        })
        .await?;
        Ok(())
    }

    /// Upsert documents with exponential backoff retry logic.
    async fn bulk_upsert_with_retry(
        &self,
        documents: &[SearchDocument],
        shutdown: &mut Shutdown,
    ) -> Result<(BulkSummary, u32), PipelineError> {
        self.with_retry("bulk_upsert", shutdown, || self.client.bulk_upsert(documents))
            .await
    }

    /// Run a search engine call with capped exponential backoff.
    ///
    /// Returns the value and the number of attempts made. Each attempt and
    /// each wait gives way to the shutdown signal.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        shutdown: &mut Shutdown,
        mut call: F,
    ) -> Result<(T, u32), PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SearchError>>,
    {
        let max_attempts = self.config.max_retries.max(1);
        let mut delay_ms = self.config.initial_retry_delay_ms;
        let mut attempt = 0;

        loop {
            if shutdown.is_shutdown() {
                return Err(PipelineError::Cancelled);
            }
            attempt += 1;

            let result = tokio::select! {
                result = call() => result,
                _ = shutdown.recv() => return Err(PipelineError::Cancelled),
            };

            let error = match result {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Search engine call succeeded after retry");
                    }
                    return Ok((value, attempt));
                }
                Err(e) => e,
            };

            if !error.is_transient() {
                debug!(operation, error = %error, "Non-retryable error encountered");
                return Err(PipelineError::SearchError(error));
            }

            // Don't wait after the last attempt
            if attempt >= max_attempts {
                return Err(PipelineError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error,
                });
            }

            warn!(
                operation,
                attempt = attempt,
                max_retries = max_attempts,
                delay_ms = delay_ms,
                error = %error,
                "Search engine call failed, retrying"
            );

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                _ = shutdown.recv() => return Err(PipelineError::Cancelled),
            }

            delay_ms = std::cmp::min(delay_ms.saturating_mul(2), self.config.max_retry_delay_ms);
        }
    }

    /// Pair bulk results with the documents they answer.
    fn report(
        documents: &[SearchDocument],
        summary: BulkSummary,
        attempts: u32,
    ) -> Result<LoadReport, PipelineError> {
        if summary.results.len() != documents.len() {
            return Err(PipelineError::SearchError(SearchError::parse(format!(
                "bulk summary has {} results for {} documents",
                summary.results.len(),
                documents.len()
            ))));
        }

        let mut report = LoadReport {
            attempts,
            ..LoadReport::default()
        };

        for (doc, result) in documents.iter().zip(summary.results) {
            if result.success {
                report.indexed.push(doc.id());
            } else {
                report.rejected.push(Rejection {
                    entity_id: doc.id(),
                    reason: result.error.unwrap_or_else(|| "rejected".to_string()),
                });
            }
        }

        Ok(report)
    }
}
