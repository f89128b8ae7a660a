//! Relation aggregation.
//!
//! Join rows arrive flat and may repeat. These functions fold them into one
//! row per entity, with every related entity listed once.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

use movies_indexer_shared::{
    Credits, FilmWorkRecord, FilmWorkRow, GenreLink, GenreRecord, GenreRow, NamedRef, PersonJob,
    PersonLink, PersonRecord, PersonRow,
};

/// Named references keyed by id, so repeated join rows collapse.
#[derive(Default)]
struct RefSet(BTreeMap<Uuid, String>);

impl RefSet {
    fn insert(&mut self, id: Uuid, name: &str) {
        self.0.entry(id).or_insert_with(|| name.to_string());
    }

    /// Ordered by name, then id.
    fn into_sorted(self) -> Vec<NamedRef> {
        let mut refs: Vec<NamedRef> = self
            .0
            .into_iter()
            .map(|(id, name)| NamedRef { id, name })
            .collect();
        refs.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        refs
    }
}

#[derive(Default)]
struct FilmRelations {
    genres: RefSet,
    actors: RefSet,
    directors: RefSet,
    writers: RefSet,
}

impl FilmRelations {
    fn credits_for(&mut self, job: PersonJob) -> &mut RefSet {
        match job {
            PersonJob::Actor => &mut self.actors,
            PersonJob::Director => &mut self.directors,
            PersonJob::Writer => &mut self.writers,
        }
    }

    fn into_parts(self) -> (Vec<NamedRef>, Credits) {
        let credits = Credits {
            actors: self.actors.into_sorted(),
            directors: self.directors.into_sorted(),
            writers: self.writers.into_sorted(),
        };
        (self.genres.into_sorted(), credits)
    }
}

/// Keep records in the order of `ids`, dropping ids with no record.
fn in_order<T>(ids: &[Uuid], records: Vec<T>, id_of: impl Fn(&T) -> Uuid) -> Vec<T> {
    let mut by_id: HashMap<Uuid, T> = records.into_iter().map(|r| (id_of(&r), r)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

/// Build film work rows with deduplicated genres and per-job credits.
pub fn film_work_rows(
    ids: &[Uuid],
    records: Vec<FilmWorkRecord>,
    genre_links: &[GenreLink],
    person_links: &[PersonLink],
) -> Vec<FilmWorkRow> {
    let mut relations: HashMap<Uuid, FilmRelations> = HashMap::new();

    for link in genre_links {
        relations
            .entry(link.film_work_id)
            .or_default()
            .genres
            .insert(link.genre_id, &link.genre_name);
    }
    for link in person_links {
        relations
            .entry(link.film_work_id)
            .or_default()
            .credits_for(link.job)
            .insert(link.person_id, &link.full_name);
    }

    in_order(ids, records, |r| r.id)
        .into_iter()
        .map(|record| {
            let (genres, credits) = relations.remove(&record.id).unwrap_or_default().into_parts();
            FilmWorkRow {
                record,
                genres,
                credits,
            }
        })
        .collect()
}

/// Build person rows with deduplicated film ids and jobs.
pub fn person_rows(
    ids: &[Uuid],
    records: Vec<PersonRecord>,
    links: &[PersonLink],
) -> Vec<PersonRow> {
    let mut films: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
    let mut roles: HashMap<Uuid, BTreeSet<PersonJob>> = HashMap::new();

    for link in links {
        films.entry(link.person_id).or_default().insert(link.film_work_id);
        roles.entry(link.person_id).or_default().insert(link.job);
    }

    in_order(ids, records, |r| r.id)
        .into_iter()
        .map(|record| PersonRow {
            film_ids: films.remove(&record.id).unwrap_or_default().into_iter().collect(),
            roles: roles.remove(&record.id).unwrap_or_default().into_iter().collect(),
            record,
        })
        .collect()
}

/// Build genre rows counting distinct linked film works.
pub fn genre_rows(ids: &[Uuid], records: Vec<GenreRecord>, links: &[GenreLink]) -> Vec<GenreRow> {
    let mut films: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();

    for link in links {
        films.entry(link.genre_id).or_default().insert(link.film_work_id);
    }

    in_order(ids, records, |r| r.id)
        .into_iter()
        .map(|record| GenreRow {
            film_count: films.get(&record.id).map_or(0, BTreeSet::len),
            record,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film(id: Uuid, title: &str) -> FilmWorkRecord {
        FilmWorkRecord {
            id,
            title: title.to_string(),
            description: None,
            creation_date: None,
            imdb_rating: None,
            film_rating: None,
            film_type: None,
        }
    }

    fn person_link(film_work_id: Uuid, person_id: Uuid, name: &str, job: PersonJob) -> PersonLink {
        PersonLink {
            film_work_id,
            person_id,
            full_name: name.to_string(),
            job,
        }
    }

    #[test]
    fn test_duplicate_join_rows_collapse() {
        let film_id = Uuid::new_v4();
        let drama = Uuid::new_v4();
        let (anna, boris) = (Uuid::new_v4(), Uuid::new_v4());

        let genre_link = GenreLink {
            film_work_id: film_id,
            genre_id: drama,
            genre_name: "Drama".to_string(),
        };
        let person_links = vec![
            person_link(film_id, boris, "Boris", PersonJob::Actor),
            person_link(film_id, anna, "Anna", PersonJob::Actor),
            person_link(film_id, boris, "Boris", PersonJob::Actor),
        ];

        let rows = film_work_rows(
            &[film_id],
            vec![film(film_id, "Solaris")],
            &[genre_link.clone(), genre_link],
            &person_links,
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].genres, vec![NamedRef::new(drama, "Drama")]);
        assert_eq!(
            rows[0].credits.actors,
            vec![NamedRef::new(anna, "Anna"), NamedRef::new(boris, "Boris")]
        );
        assert!(rows[0].credits.directors.is_empty());
    }

    #[test]
    fn test_same_person_in_several_jobs() {
        let film_id = Uuid::new_v4();
        let person = Uuid::new_v4();
        let links = vec![
            person_link(film_id, person, "Andrei", PersonJob::Director),
            person_link(film_id, person, "Andrei", PersonJob::Writer),
        ];

        let rows = film_work_rows(&[film_id], vec![film(film_id, "Mirror")], &[], &links);

        assert_eq!(rows[0].credits.directors.len(), 1);
        assert_eq!(rows[0].credits.writers.len(), 1);
        assert!(rows[0].credits.actors.is_empty());
    }

    #[test]
    fn test_rows_follow_detection_order() {
        let (first, second, gone) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let records = vec![film(second, "B"), film(first, "A")];

        let rows = film_work_rows(&[first, gone, second], records, &[], &[]);

        let ids: Vec<Uuid> = rows.iter().map(|r| r.record.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn test_person_roles_and_films() {
        let person = PersonRecord {
            id: Uuid::new_v4(),
            full_name: "Margarita Terekhova".to_string(),
        };
        let (f1, f2) = (Uuid::new_v4(), Uuid::new_v4());
        let links = vec![
            person_link(f1, person.id, &person.full_name, PersonJob::Actor),
            person_link(f2, person.id, &person.full_name, PersonJob::Actor),
            person_link(f1, person.id, &person.full_name, PersonJob::Actor),
            person_link(f2, person.id, &person.full_name, PersonJob::Writer),
        ];

        let rows = person_rows(&[person.id], vec![person.clone()], &links);

        let mut expected_films = vec![f1, f2];
        expected_films.sort();
        assert_eq!(rows[0].film_ids, expected_films);
        assert_eq!(rows[0].roles, vec![PersonJob::Actor, PersonJob::Writer]);
    }

    #[test]
    fn test_genre_film_count_is_distinct() {
        let genre = GenreRecord {
            id: Uuid::new_v4(),
            name: "Sci-Fi".to_string(),
            description: None,
        };
        let film_id = Uuid::new_v4();
        let link = GenreLink {
            film_work_id: film_id,
            genre_id: genre.id,
            genre_name: genre.name.clone(),
        };
        let other = GenreLink {
            film_work_id: Uuid::new_v4(),
            ..link.clone()
        };

        let rows = genre_rows(&[genre.id], vec![genre.clone()], &[link.clone(), link, other]);

        assert_eq!(rows[0].film_count, 2);
    }

    #[test]
    fn test_unlinked_entities_have_empty_relations() {
        let genre = GenreRecord {
            id: Uuid::new_v4(),
            name: "Noir".to_string(),
            description: None,
        };

        let rows = genre_rows(&[genre.id], vec![genre], &[]);

        assert_eq!(rows[0].film_count, 0);
    }
}
