//! Extracted rows: records plus the denormalized relation aggregates the
//! transformer needs.

use uuid::Uuid;

use crate::document::NamedRef;
use crate::entity::{EntityKind, PersonJob};
use crate::record::{FilmWorkRecord, GenreRecord, PersonRecord};

/// People credited on a film work, one list per job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credits {
    pub actors: Vec<NamedRef>,
    pub directors: Vec<NamedRef>,
    pub writers: Vec<NamedRef>,
}

impl Credits {
    /// The list holding people with the given job.
    pub fn for_job(&self, job: PersonJob) -> &[NamedRef] {
        match job {
            PersonJob::Actor => &self.actors,
            PersonJob::Director => &self.directors,
            PersonJob::Writer => &self.writers,
        }
    }

    /// Mutable access to the list holding people with the given job.
    pub fn for_job_mut(&mut self, job: PersonJob) -> &mut Vec<NamedRef> {
        match job {
            PersonJob::Actor => &mut self.actors,
            PersonJob::Director => &mut self.directors,
            PersonJob::Writer => &mut self.writers,
        }
    }
}

/// A film work with deduplicated genres and per-job credits.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmWorkRow {
    pub record: FilmWorkRecord,
    pub genres: Vec<NamedRef>,
    pub credits: Credits,
}

/// A person with the film works and jobs they are credited with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRow {
    pub record: PersonRecord,
    pub film_ids: Vec<Uuid>,
    pub roles: Vec<PersonJob>,
}

/// A genre with the number of film works linked to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreRow {
    pub record: GenreRecord,
    pub film_count: usize,
}

/// The rows of one extracted batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedRows {
    FilmWorks(Vec<FilmWorkRow>),
    Persons(Vec<PersonRow>),
    Genres(Vec<GenreRow>),
}

impl ExtractedRows {
    /// Empty rows for the given kind.
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::FilmWork => ExtractedRows::FilmWorks(Vec::new()),
            EntityKind::Person => ExtractedRows::Persons(Vec::new()),
            EntityKind::Genre => ExtractedRows::Genres(Vec::new()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            ExtractedRows::FilmWorks(_) => EntityKind::FilmWork,
            ExtractedRows::Persons(_) => EntityKind::Person,
            ExtractedRows::Genres(_) => EntityKind::Genre,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ExtractedRows::FilmWorks(rows) => rows.len(),
            ExtractedRows::Persons(rows) => rows.len(),
            ExtractedRows::Genres(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of the extracted rows, in batch order.
    pub fn ids(&self) -> Vec<Uuid> {
        match self {
            ExtractedRows::FilmWorks(rows) => rows.iter().map(|r| r.record.id).collect(),
            ExtractedRows::Persons(rows) => rows.iter().map(|r| r.record.id).collect(),
            ExtractedRows::Genres(rows) => rows.iter().map(|r| r.record.id).collect(),
        }
    }
}
