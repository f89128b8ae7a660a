//! In-memory relational source.
//!
//! Holds the same tables as the PostgreSQL schema and applies the same
//! staleness rule, so pipelines can be driven end to end without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::errors::SourceError;
use crate::interfaces::RelationalSource;
use movies_indexer_shared::{
    EntityKind, FilmWorkRecord, GenreLink, GenreRecord, PersonJob, PersonLink, PersonRecord,
    StaleEntity, WATERMARK_EPOCH,
};

#[derive(Debug, Clone)]
struct Tracked<T> {
    record: T,
    modified: DateTime<Utc>,
    indexed_at: DateTime<Utc>,
}

impl<T> Tracked<T> {
    fn new(record: T, modified: DateTime<Utc>) -> Self {
        Self {
            record,
            modified,
            indexed_at: WATERMARK_EPOCH,
        }
    }
}

#[derive(Debug, Clone)]
struct GenreLinkRow {
    film_work_id: Uuid,
    genre_id: Uuid,
    modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PersonLinkRow {
    film_work_id: Uuid,
    person_id: Uuid,
    job: PersonJob,
    modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Catalog {
    film_works: BTreeMap<Uuid, Tracked<FilmWorkRecord>>,
    persons: BTreeMap<Uuid, Tracked<PersonRecord>>,
    genres: BTreeMap<Uuid, Tracked<GenreRecord>>,
    genre_links: Vec<GenreLinkRow>,
    person_links: Vec<PersonLinkRow>,
}

impl Catalog {
    fn last_modified(&self, kind: EntityKind, id: Uuid) -> Option<DateTime<Utc>> {
        match kind {
            EntityKind::FilmWork => {
                let own = self.film_works.get(&id)?.modified;
                let genres = self
                    .genre_links
                    .iter()
                    .filter(|l| l.film_work_id == id)
                    .filter_map(|l| {
                        let genre = self.genres.get(&l.genre_id)?;
                        Some(l.modified.max(genre.modified))
                    });
                let persons = self
                    .person_links
                    .iter()
                    .filter(|l| l.film_work_id == id)
                    .filter_map(|l| {
                        let person = self.persons.get(&l.person_id)?;
                        Some(l.modified.max(person.modified))
                    });
                Some(genres.chain(persons).fold(own, |acc, t| acc.max(t)))
            }
            EntityKind::Person => {
                let own = self.persons.get(&id)?.modified;
                Some(
                    self.person_links
                        .iter()
                        .filter(|l| l.person_id == id)
                        .map(|l| l.modified)
                        .fold(own, |acc, t| acc.max(t)),
                )
            }
            EntityKind::Genre => {
                let own = self.genres.get(&id)?.modified;
                Some(
                    self.genre_links
                        .iter()
                        .filter(|l| l.genre_id == id)
                        .map(|l| l.modified)
                        .fold(own, |acc, t| acc.max(t)),
                )
            }
        }
    }

    fn indexed_at(&self, kind: EntityKind, id: Uuid) -> Option<DateTime<Utc>> {
        match kind {
            EntityKind::FilmWork => self.film_works.get(&id).map(|t| t.indexed_at),
            EntityKind::Person => self.persons.get(&id).map(|t| t.indexed_at),
            EntityKind::Genre => self.genres.get(&id).map(|t| t.indexed_at),
        }
    }

    fn watermark_mut(&mut self, kind: EntityKind, id: Uuid) -> Option<&mut DateTime<Utc>> {
        match kind {
            EntityKind::FilmWork => self.film_works.get_mut(&id).map(|t| &mut t.indexed_at),
            EntityKind::Person => self.persons.get_mut(&id).map(|t| &mut t.indexed_at),
            EntityKind::Genre => self.genres.get_mut(&id).map(|t| &mut t.indexed_at),
        }
    }

    fn ids(&self, kind: EntityKind) -> Vec<Uuid> {
        match kind {
            EntityKind::FilmWork => self.film_works.keys().copied().collect(),
            EntityKind::Person => self.persons.keys().copied().collect(),
            EntityKind::Genre => self.genres.keys().copied().collect(),
        }
    }

    fn genre_link(&self, film_work_id: Uuid, genre_id: Uuid) -> Option<GenreLink> {
        let genre = self.genres.get(&genre_id)?;
        Some(GenreLink {
            film_work_id,
            genre_id,
            genre_name: genre.record.name.clone(),
        })
    }

    fn person_link(&self, link: &PersonLinkRow) -> Option<PersonLink> {
        let person = self.persons.get(&link.person_id)?;
        Some(PersonLink {
            film_work_id: link.film_work_id,
            person_id: link.person_id,
            full_name: person.record.full_name.clone(),
            job: link.job,
        })
    }
}

/// A relational source kept entirely in memory.
///
/// Inserts and edits take an explicit `modified` timestamp, mirroring what the
/// admin application writes. Watermarks start at [`WATERMARK_EPOCH`].
#[derive(Debug, Default)]
pub struct InMemorySource {
    catalog: Mutex<Catalog>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn catalog(&self) -> MutexGuard<'_, Catalog> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.catalog
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert or replace a film work.
    pub fn put_film_work(&self, record: FilmWorkRecord, modified: DateTime<Utc>) {
        let mut catalog = self.catalog();
        let indexed_at = catalog.indexed_at(EntityKind::FilmWork, record.id);
        let mut tracked = Tracked::new(record, modified);
        if let Some(indexed_at) = indexed_at {
            tracked.indexed_at = indexed_at;
        }
        catalog.film_works.insert(tracked.record.id, tracked);
    }

    /// Insert or replace a person.
    pub fn put_person(&self, record: PersonRecord, modified: DateTime<Utc>) {
        let mut catalog = self.catalog();
        let indexed_at = catalog.indexed_at(EntityKind::Person, record.id);
        let mut tracked = Tracked::new(record, modified);
        if let Some(indexed_at) = indexed_at {
            tracked.indexed_at = indexed_at;
        }
        catalog.persons.insert(tracked.record.id, tracked);
    }

    /// Insert or replace a genre.
    pub fn put_genre(&self, record: GenreRecord, modified: DateTime<Utc>) {
        let mut catalog = self.catalog();
        let indexed_at = catalog.indexed_at(EntityKind::Genre, record.id);
        let mut tracked = Tracked::new(record, modified);
        if let Some(indexed_at) = indexed_at {
            tracked.indexed_at = indexed_at;
        }
        catalog.genres.insert(tracked.record.id, tracked);
    }

    /// Add a `film_work_genre` row. Duplicate rows are allowed, as in the table.
    pub fn link_genre(&self, film_work_id: Uuid, genre_id: Uuid, modified: DateTime<Utc>) {
        self.catalog().genre_links.push(GenreLinkRow {
            film_work_id,
            genre_id,
            modified,
        });
    }

    /// Add a `film_work_person` row. Duplicate rows are allowed, as in the table.
    pub fn link_person(
        &self,
        film_work_id: Uuid,
        person_id: Uuid,
        job: PersonJob,
        modified: DateTime<Utc>,
    ) {
        self.catalog().person_links.push(PersonLinkRow {
            film_work_id,
            person_id,
            job,
            modified,
        });
    }

    /// Bump an entity's own `modified` timestamp. Returns false if it does not exist.
    pub fn touch(&self, kind: EntityKind, id: Uuid, modified: DateTime<Utc>) -> bool {
        let mut catalog = self.catalog();
        let slot = match kind {
            EntityKind::FilmWork => catalog.film_works.get_mut(&id).map(|t| &mut t.modified),
            EntityKind::Person => catalog.persons.get_mut(&id).map(|t| &mut t.modified),
            EntityKind::Genre => catalog.genres.get_mut(&id).map(|t| &mut t.modified),
        };
        match slot {
            Some(slot) => {
                *slot = modified;
                true
            }
            None => false,
        }
    }

    /// Current watermark of an entity.
    pub fn indexed_at(&self, kind: EntityKind, id: Uuid) -> Option<DateTime<Utc>> {
        self.catalog().indexed_at(kind, id)
    }

    /// Computed last-modified timestamp of an entity.
    pub fn last_modified(&self, kind: EntityKind, id: Uuid) -> Option<DateTime<Utc>> {
        self.catalog().last_modified(kind, id)
    }

    /// All ids of a kind.
    pub fn ids(&self, kind: EntityKind) -> Vec<Uuid> {
        self.catalog().ids(kind)
    }
}

#[async_trait]
impl RelationalSource for InMemorySource {
    async fn stale_entities(
        &self,
        kind: EntityKind,
        limit: usize,
        exclude: &[Uuid],
    ) -> Result<Vec<StaleEntity>, SourceError> {
        let catalog = self.catalog();
        let mut stale: Vec<StaleEntity> = catalog
            .ids(kind)
            .into_iter()
            .filter(|id| !exclude.contains(id))
            .filter_map(|id| {
                let last_modified = catalog.last_modified(kind, id)?;
                let indexed_at = catalog.indexed_at(kind, id)?;
                (last_modified > indexed_at).then_some(StaleEntity { id, last_modified })
            })
            .collect();

        stale.sort_by(|a, b| {
            a.last_modified
                .cmp(&b.last_modified)
                .then_with(|| a.id.cmp(&b.id))
        });
        stale.truncate(limit);
        Ok(stale)
    }

    async fn film_works(&self, ids: &[Uuid]) -> Result<Vec<FilmWorkRecord>, SourceError> {
        let catalog = self.catalog();
        Ok(ids
            .iter()
            .filter_map(|id| catalog.film_works.get(id))
            .map(|t| t.record.clone())
            .collect())
    }

    async fn genre_links_for_films(&self, film_ids: &[Uuid]) -> Result<Vec<GenreLink>, SourceError> {
        let catalog = self.catalog();
        Ok(catalog
            .genre_links
            .iter()
            .filter(|l| film_ids.contains(&l.film_work_id))
            .filter_map(|l| catalog.genre_link(l.film_work_id, l.genre_id))
            .collect())
    }

    async fn person_links_for_films(
        &self,
        film_ids: &[Uuid],
    ) -> Result<Vec<PersonLink>, SourceError> {
        let catalog = self.catalog();
        Ok(catalog
            .person_links
            .iter()
            .filter(|l| film_ids.contains(&l.film_work_id))
            .filter_map(|l| catalog.person_link(l))
            .collect())
    }

    async fn persons(&self, ids: &[Uuid]) -> Result<Vec<PersonRecord>, SourceError> {
        let catalog = self.catalog();
        Ok(ids
            .iter()
            .filter_map(|id| catalog.persons.get(id))
            .map(|t| t.record.clone())
            .collect())
    }

    async fn person_links_for_persons(
        &self,
        person_ids: &[Uuid],
    ) -> Result<Vec<PersonLink>, SourceError> {
        let catalog = self.catalog();
        Ok(catalog
            .person_links
            .iter()
            .filter(|l| person_ids.contains(&l.person_id))
            .filter_map(|l| catalog.person_link(l))
            .collect())
    }

    async fn genres(&self, ids: &[Uuid]) -> Result<Vec<GenreRecord>, SourceError> {
        let catalog = self.catalog();
        Ok(ids
            .iter()
            .filter_map(|id| catalog.genres.get(id))
            .map(|t| t.record.clone())
            .collect())
    }

    async fn genre_links_for_genres(
        &self,
        genre_ids: &[Uuid],
    ) -> Result<Vec<GenreLink>, SourceError> {
        let catalog = self.catalog();
        Ok(catalog
            .genre_links
            .iter()
            .filter(|l| genre_ids.contains(&l.genre_id))
            .filter_map(|l| catalog.genre_link(l.film_work_id, l.genre_id))
            .collect())
    }

    async fn stamp_indexed(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
        indexed_at: DateTime<Utc>,
    ) -> Result<u64, SourceError> {
        let mut catalog = self.catalog();
        let mut updated = 0;
        for id in ids {
            if let Some(watermark) = catalog.watermark_mut(kind, *id) {
                *watermark = (*watermark).max(indexed_at);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn reset_watermarks(&self, kind: EntityKind) -> Result<u64, SourceError> {
        let mut catalog = self.catalog();
        let mut updated = 0;
        for id in catalog.ids(kind) {
            if let Some(watermark) = catalog.watermark_mut(kind, id) {
                *watermark = WATERMARK_EPOCH;
                updated += 1;
            }
        }
        Ok(updated)
    }
}
