//! Time budget for database round-trips.

use std::future::Future;
use std::time::Duration;

use crate::errors::PipelineError;
use movies_indexer_source::SourceError;

/// Run a source call, failing with [`PipelineError::Timeout`] if it does not
/// complete within `limit`.
pub(crate) async fn bounded<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(PipelineError::from),
        Err(_) => Err(PipelineError::Timeout {
            operation,
            after: limit,
        }),
    }
}
