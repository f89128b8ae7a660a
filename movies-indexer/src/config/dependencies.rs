//! Dependency initialization and wiring for the movies indexer.

use std::sync::Arc;
use tracing::{info, warn};

use crate::{IndexingError, Settings};
use movies_indexer_pipeline::{IndexBootstrap, Orchestrator};
use movies_indexer_repository::{OpenSearchClient, SearchEngineClient};
use movies_indexer_source::{PostgresSource, RelationalSource};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
    /// Index recreation for full resyncs.
    pub bootstrap: IndexBootstrap,
}

impl Dependencies {
    /// Connect to the database and the search engine, and wire the pipeline.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If the database is unreachable or the search
    ///   endpoint is malformed
    ///
    /// An unreachable search engine is not fatal here: the health check retries with
    /// the loader's backoff, and each entity pipeline retries its own index
    /// check before failing on its own.
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        info!(
            postgres_host = %settings.postgres.host,
            postgres_db = %settings.postgres.database,
            postgres_schema = %settings.postgres.schema,
            opensearch_url = %settings.opensearch.url(),
            batch_size = settings.batch_size,
            concurrent = settings.concurrent,
            "Initializing dependencies"
        );

        let source = PostgresSource::connect(&settings.postgres).await?;
        source.health_check().await?;

        info!("PostgreSQL connection verified");

        let search_client = OpenSearchClient::new(&settings.opensearch).map_err(|e| {
            IndexingError::config(format!("Failed to create OpenSearch client: {}", e))
        })?;

        let source: Arc<dyn RelationalSource> = Arc::new(source);
        let client: Arc<dyn SearchEngineClient> = Arc::new(search_client);

        let orchestrator = Orchestrator::with_config(
            Arc::clone(&source),
            Arc::clone(&client),
            settings.orchestrator_config(),
        );
        let bootstrap = IndexBootstrap::new(source, client);

        match orchestrator.wait_for_search_engine().await {
            Ok(()) => info!("OpenSearch connection verified"),
            Err(e) => warn!(error = %e, "OpenSearch not reachable yet, entity pipelines will retry"),
        }

        Ok(Self {
            orchestrator,
            bootstrap,
        })
    }
}
