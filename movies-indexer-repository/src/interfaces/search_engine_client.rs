//! Search engine client trait definition.
//!
//! This module defines the abstract interface for search engine operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, mocks).

use async_trait::async_trait;

use crate::errors::SearchError;
use crate::types::BulkSummary;
use movies_indexer_shared::{EntityKind, SearchDocument};

/// Abstract interface for search engine operations.
///
/// This trait defines the operations the indexer needs: bulk upserts keyed by
/// document id, index lifecycle, and a health check. Implementations can be
/// swapped for different backends (OpenSearch, mock, etc.).
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, SearchError>`; [`SearchError::is_transient`]
/// tells callers whether a retry can help.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Upsert documents in a single bulk operation.
    ///
    /// Each document is written to its own index under its entity id, replacing
    /// any previous version.
    ///
    /// # Arguments
    ///
    /// * `documents` - Documents to write, possibly for several indices
    ///
    /// # Returns
    ///
    /// * `Ok(BulkSummary)` - The request was accepted; per-document outcomes inside
    /// * `Err(SearchError)` - The request as a whole failed and nothing can be
    ///   assumed written
    async fn bulk_upsert(&self, documents: &[SearchDocument]) -> Result<BulkSummary, SearchError>;

    /// Ensure the index for `kind` exists with its mappings.
    ///
    /// If the index doesn't exist, it will be created. Existing indices are
    /// left untouched.
    async fn ensure_index_exists(&self, kind: EntityKind) -> Result<(), SearchError>;

    /// Drop and recreate the index for `kind` with its mappings.
    async fn recreate_index(&self, kind: EntityKind) -> Result<(), SearchError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the cluster status is green or yellow
    /// * `Ok(false)` - If the cluster is red
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}
