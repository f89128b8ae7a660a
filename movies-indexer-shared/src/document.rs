//! Search index documents.
//!
//! Each entity kind has its own document shape and its own index. The
//! [`SearchDocument`] envelope carries the destination index and the document
//! key, which is always the entity id so re-indexing overwrites.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::entity::EntityKind;

/// A related entity reference: `{id, name}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: Uuid,
    pub name: String,
}

impl NamedRef {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Document stored in the `movies` index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDocument {
    pub id: Uuid,
    pub title: String,
    /// Empty when the film has no description.
    #[serde(default)]
    pub description: String,
    pub imdb_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub film_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    pub genres: Vec<NamedRef>,
    pub genres_names: Vec<String>,
    pub actors: Vec<NamedRef>,
    pub actors_names: Vec<String>,
    pub directors: Vec<NamedRef>,
    pub directors_names: Vec<String>,
    pub writers: Vec<NamedRef>,
    pub writers_names: Vec<String>,
}

/// Document stored in the `persons` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDocument {
    pub id: Uuid,
    pub full_name: String,
    pub roles: Vec<String>,
    pub film_ids: Vec<Uuid>,
}

/// Document stored in the `genres` index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreDocument {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub film_count: usize,
}

/// A document tagged with its destination index.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchDocument {
    Movie(MovieDocument),
    Person(PersonDocument),
    Genre(GenreDocument),
}

impl SearchDocument {
    pub fn kind(&self) -> EntityKind {
        match self {
            SearchDocument::Movie(_) => EntityKind::FilmWork,
            SearchDocument::Person(_) => EntityKind::Person,
            SearchDocument::Genre(_) => EntityKind::Genre,
        }
    }

    /// The index this document is written to.
    pub fn index_name(&self) -> &'static str {
        self.kind().index_name()
    }

    /// The entity id, also used as the document key.
    pub fn id(&self) -> Uuid {
        match self {
            SearchDocument::Movie(doc) => doc.id,
            SearchDocument::Person(doc) => doc.id,
            SearchDocument::Genre(doc) => doc.id,
        }
    }

    /// Document key in the index.
    pub fn document_id(&self) -> String {
        self.id().to_string()
    }

    /// The JSON `_source` body.
    pub fn to_source(&self) -> serde_json::Result<Value> {
        match self {
            SearchDocument::Movie(doc) => serde_json::to_value(doc),
            SearchDocument::Person(doc) => serde_json::to_value(doc),
            SearchDocument::Genre(doc) => serde_json::to_value(doc),
        }
    }
}
