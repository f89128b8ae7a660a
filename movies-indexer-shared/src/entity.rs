//! Entity kinds and person jobs.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Watermark assigned to rows that have never been indexed.
///
/// Resetting every `indexed_at` to this value forces a full resync.
pub const WATERMARK_EPOCH: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// The entity types kept in sync with the search index.
///
/// Each kind owns one relational table and one index namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// Movies, series and shows (`film_work` table).
    FilmWork,
    /// People credited on film works (`person` table).
    Person,
    /// Genres (`genre` table).
    Genre,
}

impl EntityKind {
    /// All kinds, in the order a full sync runs them.
    pub const ALL: [EntityKind; 3] = [EntityKind::FilmWork, EntityKind::Person, EntityKind::Genre];

    /// Name of the search index holding documents of this kind.
    pub fn index_name(&self) -> &'static str {
        match self {
            EntityKind::FilmWork => "movies",
            EntityKind::Person => "persons",
            EntityKind::Genre => "genres",
        }
    }

    /// Name of the relational table holding rows of this kind.
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::FilmWork => "film_work",
            EntityKind::Person => "person",
            EntityKind::Genre => "genre",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.index_name())
    }
}

/// Error returned when an entity kind name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity kind: {0}")]
pub struct ParseEntityKindError(pub String);

impl FromStr for EntityKind {
    type Err = ParseEntityKindError;

    /// Accepts index names (`movies`) as well as table names (`film_work`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movies" | "movie" | "film_work" | "film_works" | "filmwork" => Ok(EntityKind::FilmWork),
            "persons" | "person" | "people" => Ok(EntityKind::Person),
            "genres" | "genre" => Ok(EntityKind::Genre),
            other => Err(ParseEntityKindError(other.to_string())),
        }
    }
}

/// The job a person holds on a film work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PersonJob {
    Actor,
    Director,
    Writer,
}

impl PersonJob {
    pub const ALL: [PersonJob; 3] = [PersonJob::Actor, PersonJob::Director, PersonJob::Writer];

    /// Value stored in the `film_work_person.job` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonJob::Actor => "actor",
            PersonJob::Director => "director",
            PersonJob::Writer => "writer",
        }
    }
}

impl fmt::Display for PersonJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a `job` column value is not a known job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown person job: {0}")]
pub struct ParsePersonJobError(pub String);

impl FromStr for PersonJob {
    type Err = ParsePersonJobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "actor" => Ok(PersonJob::Actor),
            "director" => Ok(PersonJob::Director),
            "writer" => Ok(PersonJob::Writer),
            other => Err(ParsePersonJobError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_names_are_disjoint() {
        let names: std::collections::HashSet<_> =
            EntityKind::ALL.iter().map(|k| k.index_name()).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(EntityKind::FilmWork.index_name(), "movies");
    }

    #[test]
    fn test_parse_entity_kind() {
        assert_eq!("movies".parse::<EntityKind>().unwrap(), EntityKind::FilmWork);
        assert_eq!(" Persons ".parse::<EntityKind>().unwrap(), EntityKind::Person);
        assert_eq!("genre".parse::<EntityKind>().unwrap(), EntityKind::Genre);
        assert!("studios".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_parse_person_job() {
        for job in PersonJob::ALL {
            assert_eq!(job.as_str().parse::<PersonJob>().unwrap(), job);
        }
        assert_eq!("Director".parse::<PersonJob>().unwrap(), PersonJob::Director);
        assert_eq!(
            "producer".parse::<PersonJob>().unwrap_err(),
            ParsePersonJobError("producer".to_string())
        );
    }

    #[test]
    fn test_watermark_epoch_is_far_past() {
        assert!(WATERMARK_EPOCH < Utc::now());
        assert_eq!(WATERMARK_EPOCH.timestamp(), 0);
    }
}
