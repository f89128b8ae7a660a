//! Result types for bulk index operations.

/// Result of a bulk operation for a single document.
///
/// The index accepts or rejects documents individually within one bulk call;
/// a rejection carries the reason reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResult {
    /// The document key (the entity id).
    pub document_id: String,
    /// Whether the document was written.
    pub success: bool,
    /// Engine-reported reason if the document was rejected.
    pub error: Option<String>,
}

impl BulkItemResult {
    pub fn accepted(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            success: true,
            error: None,
        }
    }

    pub fn rejected(document_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Summary of a bulk operation containing aggregate statistics and individual results.
///
/// This allows callers to handle partial failures: the accepted documents are
/// durable even when some siblings were rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSummary {
    /// Total number of documents in the request.
    pub total: usize,
    /// Number of documents written.
    pub succeeded: usize,
    /// Number of documents rejected.
    pub failed: usize,
    /// Individual results, in request order.
    pub results: Vec<BulkItemResult>,
}

impl BulkSummary {
    /// Build a summary from per-document results.
    pub fn from_results(results: Vec<BulkItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Summary of an empty request.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let summary = BulkSummary::from_results(vec![
            BulkItemResult::accepted("a"),
            BulkItemResult::rejected("b", "mapper_parsing_exception"),
            BulkItemResult::accepted("c"),
        ]);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert!(summary.has_failures());
        assert_eq!(
            summary.results[1].error.as_deref(),
            Some("mapper_parsing_exception")
        );
    }

    #[test]
    fn test_empty_summary() {
        let summary = BulkSummary::empty();
        assert_eq!(summary.total, 0);
        assert!(!summary.has_failures());
    }
}
