//! Bulk request bodies and bulk response parsing.

use serde_json::{json, Value};

use crate::errors::SearchError;
use crate::types::{BulkItemResult, BulkSummary};
use movies_indexer_shared::SearchDocument;

/// Build the NDJSON lines of a bulk upsert: an `index` action followed by the
/// document source, per document.
pub fn build_bulk_body(documents: &[SearchDocument]) -> Result<Vec<Value>, SearchError> {
    let mut body = Vec::with_capacity(documents.len() * 2);

    for doc in documents {
        body.push(json!({
            "index": {
                "_index": doc.index_name(),
                "_id": doc.document_id()
            }
        }));
        body.push(doc.to_source()?);
    }

    Ok(body)
}

/// Render an item-level error object as `type: reason`.
fn describe_error(error: &Value) -> String {
    let kind = error.get("type").and_then(Value::as_str);
    let reason = error.get("reason").and_then(Value::as_str);
    match (kind, reason) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        (Some(kind), None) => kind.to_string(),
        (None, Some(reason)) => reason.to_string(),
        (None, None) => error.to_string(),
    }
}

/// Parse the body of a bulk response into per-document results.
///
/// Items are reported in request order. When the response omits an item's
/// `_id`, the id of the document at the same position is used.
pub fn parse_bulk_response(
    response: &Value,
    documents: &[SearchDocument],
) -> Result<BulkSummary, SearchError> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::parse("bulk response has no items array"))?;

    if items.len() != documents.len() {
        return Err(SearchError::parse(format!(
            "bulk response has {} items for {} documents",
            items.len(),
            documents.len()
        )));
    }

    let results = items
        .iter()
        .zip(documents)
        .map(|(item, doc)| {
            // Each item is keyed by its action name, e.g. {"index": {...}}.
            let outcome = item
                .as_object()
                .and_then(|actions| actions.values().next())
                .unwrap_or(&Value::Null);

            let document_id = outcome
                .get("_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| doc.document_id());

            let status = outcome.get("status").and_then(Value::as_u64).unwrap_or(0);

            match outcome.get("error") {
                Some(error) => BulkItemResult::rejected(document_id, describe_error(error)),
                None if (200..300).contains(&status) => BulkItemResult::accepted(document_id),
                None => BulkItemResult::rejected(document_id, format!("status {}", status)),
            }
        })
        .collect();

    Ok(BulkSummary::from_results(results))
}
