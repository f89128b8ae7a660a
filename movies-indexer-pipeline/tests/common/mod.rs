//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

use movies_indexer_repository::{BulkItemResult, BulkSummary, SearchEngineClient, SearchError};
use movies_indexer_shared::{
    EntityKind, FilmWorkRecord, GenreRecord, PersonRecord, SearchDocument,
};

/// Search client that records every bulk request it receives.
#[derive(Default)]
pub struct RecordingClient {
    requests: Mutex<Vec<Vec<SearchDocument>>>,
    failures: Mutex<VecDeque<SearchError>>,
    always_fail: Mutex<Option<SearchError>>,
    reject: Mutex<HashSet<Uuid>>,
    ensure_failures: Mutex<VecDeque<SearchError>>,
    ensure_calls: Mutex<Vec<EntityKind>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next requests with these errors, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = SearchError>) {
        self.failures.lock().unwrap().extend(errors);
    }

    /// Fail every request until `heal` is called.
    pub fn fail_always(&self, error: SearchError) {
        *self.always_fail.lock().unwrap() = Some(error);
    }

    pub fn heal(&self) {
        *self.always_fail.lock().unwrap() = None;
        self.failures.lock().unwrap().clear();
    }

    /// Fail the next index checks with these errors, in order.
    pub fn fail_next_ensure(&self, errors: impl IntoIterator<Item = SearchError>) {
        self.ensure_failures.lock().unwrap().extend(errors);
    }

    /// Every index check received, failed ones included.
    pub fn ensure_calls(&self) -> Vec<EntityKind> {
        self.ensure_calls.lock().unwrap().clone()
    }

    /// Reject the document of `id` in every bulk response.
    pub fn reject(&self, id: Uuid) {
        self.reject.lock().unwrap().insert(id);
    }

    /// Every request received, failed ones included.
    pub fn requests(&self) -> Vec<Vec<SearchDocument>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_sizes(&self) -> Vec<usize> {
        self.requests().iter().map(Vec::len).collect()
    }

    /// Every document received, failed requests included.
    pub fn documents(&self) -> Vec<SearchDocument> {
        self.requests().into_iter().flatten().collect()
    }

    pub fn clear(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl SearchEngineClient for RecordingClient {
    async fn bulk_upsert(&self, docs: &[SearchDocument]) -> Result<BulkSummary, SearchError> {
        self.requests.lock().unwrap().push(docs.to_vec());

        if let Some(error) = self.always_fail.lock().unwrap().clone() {
            return Err(error);
        }
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let reject = self.reject.lock().unwrap();
        let results = docs
            .iter()
            .map(|doc| {
                if reject.contains(&doc.id()) {
                    BulkItemResult::rejected(doc.document_id(), "mapper_parsing_exception: bad field")
                } else {
                    BulkItemResult::accepted(doc.document_id())
                }
            })
            .collect();

        Ok(BulkSummary::from_results(results))
    }

    async fn ensure_index_exists(&self, kind: EntityKind) -> Result<(), SearchError> {
        self.ensure_calls.lock().unwrap().push(kind);
        match self.ensure_failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn recreate_index(&self, _kind: EntityKind) -> Result<(), SearchError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }
}

/// A timestamp `seconds` after a fixed point an hour in the past.
pub fn past(seconds: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(1) + Duration::seconds(seconds)
}

pub fn film(title: &str) -> FilmWorkRecord {
    FilmWorkRecord {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: Some(format!("About {}", title)),
        creation_date: None,
        imdb_rating: Some(7.2),
        film_rating: None,
        film_type: Some("movie".to_string()),
    }
}

pub fn person(name: &str) -> PersonRecord {
    PersonRecord {
        id: Uuid::new_v4(),
        full_name: name.to_string(),
    }
}

pub fn genre(name: &str) -> GenreRecord {
    GenreRecord {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
    }
}
