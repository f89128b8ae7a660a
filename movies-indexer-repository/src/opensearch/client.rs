//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts},
    BulkParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::OpenSearchConfig;
use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::opensearch::bulk::{build_bulk_body, parse_bulk_response};
use crate::opensearch::index_config::get_index_settings;
use crate::types::BulkSummary;
use movies_indexer_shared::{EntityKind, SearchDocument};

/// OpenSearch client implementation.
///
/// Writes movie, person and genre documents to their indices with bulk
/// requests. Every request is bounded by the configured transport timeout.
///
/// # Example
///
/// ```ignore
/// let config = OpenSearchConfig::new("localhost", 9200);
/// let client = OpenSearchClient::new(&config)?;
///
/// client.ensure_index_exists(EntityKind::FilmWork).await?;
/// let summary = client.bulk_upsert(&documents).await?;
/// println!("{} of {} indexed", summary.succeeded, summary.total);
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client for the configured endpoint.
    ///
    /// No request is sent; use [`SearchEngineClient::health_check`] to verify
    /// the cluster is reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If the URL is invalid or the transport cannot be built
    pub fn new(config: &OpenSearchConfig) -> Result<Self, SearchError> {
        let url = config.url();
        let parsed_url = Url::parse(&url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            timeout_ms = config.request_timeout.as_millis() as u64,
            "Created OpenSearch client"
        );

        Ok(Self { client })
    }

    /// Read the body of a failed response for logging.
    async fn failure(response: Response) -> (u16, String) {
        let status = response.status_code().as_u16();
        let body = response.text().await.unwrap_or_default();
        (status, body)
    }
}

/// Errors raised before any HTTP response arrived.
fn transport_error(err: opensearch::Error) -> SearchError {
    if err.is_timeout() {
        SearchError::timeout(err.to_string())
    } else {
        SearchError::connection(err.to_string())
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn bulk_upsert(&self, documents: &[SearchDocument]) -> Result<BulkSummary, SearchError> {
        if documents.is_empty() {
            return Ok(BulkSummary::empty());
        }

        let body: Vec<JsonBody<Value>> = build_bulk_body(documents)?
            .into_iter()
            .map(JsonBody::from)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status_code().is_success() {
            let (status, body) = Self::failure(response).await;
            error!(status = status, body = %body, "Bulk request failed");
            return Err(SearchError::from_status(status, body));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let summary = parse_bulk_response(&response_body, documents)?;

        debug!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk request completed"
        );

        Ok(summary)
    }

    #[instrument(skip(self), fields(index = kind.index_name()))]
    async fn ensure_index_exists(&self, kind: EntityKind) -> Result<(), SearchError> {
        let index = kind.index_name();

        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code().is_success() {
            debug!("Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(get_index_settings(kind))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code().is_success() {
            info!("Created index");
            return Ok(());
        }

        let (status, body) = Self::failure(response).await;

        // Another process may have created it between the two calls.
        if body.contains("resource_already_exists_exception") {
            debug!("Index was created concurrently");
            return Ok(());
        }

        error!(status = status, body = %body, "Index creation failed");
        Err(SearchError::index_creation(format!(
            "creating {} failed with status {}: {}",
            index, status, body
        )))
    }

    #[instrument(skip(self), fields(index = kind.index_name()))]
    async fn recreate_index(&self, kind: EntityKind) -> Result<(), SearchError> {
        let index = kind.index_name();

        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status_code();
        // 404 is acceptable - the index may not exist yet
        if !status.is_success() && status.as_u16() != 404 {
            let (status, body) = Self::failure(response).await;
            return Err(SearchError::index_creation(format!(
                "deleting {} failed with status {}: {}",
                index, status, body
            )));
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(get_index_settings(kind))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status_code().is_success() {
            let (status, body) = Self::failure(response).await;
            return Err(SearchError::index_creation(format!(
                "creating {} failed with status {}: {}",
                index, status, body
            )));
        }

        info!("Recreated index");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status_code().is_success() {
            let (status, body) = Self::failure(response).await;
            warn!(status = status, body = %body, "Cluster health request failed");
            return Ok(false);
        }

        let health: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        let status = health
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        info!(status = %status, "OpenSearch cluster status");

        Ok(status == "green" || status == "yellow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_config() {
        let config = OpenSearchConfig::new("localhost", 9200);
        assert!(OpenSearchClient::new(&config).is_ok());
    }

    #[test]
    fn test_client_rejects_invalid_url() {
        let config = OpenSearchConfig::new("http://bad host", 9200);
        assert!(matches!(
            OpenSearchClient::new(&config),
            Err(SearchError::ConnectionError(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_bulk_sends_nothing() {
        // Port 9 (discard) is never reached because no request is sent.
        let config = OpenSearchConfig::new("localhost", 9);
        let client = OpenSearchClient::new(&config).unwrap();

        let summary = client.bulk_upsert(&[]).await.unwrap();
        assert_eq!(summary.total, 0);
    }
}
