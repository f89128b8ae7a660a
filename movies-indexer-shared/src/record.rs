//! Rows as they are read from the relational source.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::entity::PersonJob;

/// An entity whose computed last-modified timestamp is newer than its watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleEntity {
    pub id: Uuid,
    /// Max over the entity's own `modified` and all related rows' `modified`.
    pub last_modified: DateTime<Utc>,
}

/// A `film_work` row.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmWorkRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creation_date: Option<NaiveDate>,
    pub imdb_rating: Option<f64>,
    /// Age classification, e.g. `PG-13`.
    pub film_rating: Option<String>,
    pub film_type: Option<String>,
}

/// A `person` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub id: Uuid,
    pub full_name: String,
}

/// A `genre` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// A `film_work_genre` row joined with its genre name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreLink {
    pub film_work_id: Uuid,
    pub genre_id: Uuid,
    pub genre_name: String,
}

/// A `film_work_person` row joined with the person's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonLink {
    pub film_work_id: Uuid,
    pub person_id: Uuid,
    pub full_name: String,
    pub job: PersonJob,
}
