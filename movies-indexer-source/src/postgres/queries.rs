//! SQL for change detection, extraction and stamping.
//!
//! Staleness is computed in the database: an entity's last-modified timestamp is
//! the greatest `modified` over the row itself and every directly related row.
//! `GREATEST` ignores NULLs, so entities without relations fall back to their
//! own timestamp.

use movies_indexer_shared::EntityKind;

/// Expression computing the last-modified timestamp of each kind, evaluated
/// against the outer row aliased `e`.
fn last_modified_expr(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::FilmWork => {
            "GREATEST(
                e.modified,
                (SELECT MAX(GREATEST(fwg.modified, g.modified))
                   FROM film_work_genre fwg
                   JOIN genre g ON g.id = fwg.genre_id
                  WHERE fwg.film_work_id = e.id),
                (SELECT MAX(GREATEST(fwp.modified, p.modified))
                   FROM film_work_person fwp
                   JOIN person p ON p.id = fwp.person_id
                  WHERE fwp.film_work_id = e.id)
            )"
        }
        EntityKind::Person => {
            "GREATEST(
                e.modified,
                (SELECT MAX(fwp.modified)
                   FROM film_work_person fwp
                  WHERE fwp.person_id = e.id)
            )"
        }
        EntityKind::Genre => {
            "GREATEST(
                e.modified,
                (SELECT MAX(fwg.modified)
                   FROM film_work_genre fwg
                  WHERE fwg.genre_id = e.id)
            )"
        }
    }
}

/// Select stale ids of a kind. Binds: `$1` limit, `$2` excluded ids.
pub(crate) fn stale_entities(kind: EntityKind) -> String {
    format!(
        "SELECT id, last_modified
           FROM (
                SELECT e.id, e.indexed_at, {expr} AS last_modified
                  FROM {table} e
                 WHERE NOT (e.id = ANY($2))
           ) candidates
          WHERE last_modified > indexed_at
          ORDER BY last_modified ASC, id ASC
          LIMIT $1",
        expr = last_modified_expr(kind),
        table = kind.table_name(),
    )
}

/// Advance watermarks. Binds: `$1` timestamp, `$2` ids.
pub(crate) fn stamp_indexed(kind: EntityKind) -> String {
    format!(
        "UPDATE {table} SET indexed_at = GREATEST(indexed_at, $1) WHERE id = ANY($2)",
        table = kind.table_name(),
    )
}

/// Reset all watermarks. Binds: `$1` epoch.
pub(crate) fn reset_watermarks(kind: EntityKind) -> String {
    format!(
        "UPDATE {table} SET indexed_at = $1",
        table = kind.table_name()
    )
}

pub(crate) const FILM_WORKS: &str = "SELECT id, title, description, creation_date, imdb_rating, film_rating, film_type
       FROM film_work
      WHERE id = ANY($1)";

pub(crate) const PERSONS: &str = "SELECT id, name AS full_name
       FROM person
      WHERE id = ANY($1)";

// The display name of a genre lives in the `genre` column.
pub(crate) const GENRES: &str = "SELECT id, genre AS name, description
       FROM genre
      WHERE id = ANY($1)";

pub(crate) const GENRE_LINKS_FOR_FILMS: &str = "SELECT fwg.film_work_id, fwg.genre_id, g.genre AS genre_name
       FROM film_work_genre fwg
       JOIN genre g ON g.id = fwg.genre_id
      WHERE fwg.film_work_id = ANY($1)";

pub(crate) const GENRE_LINKS_FOR_GENRES: &str = "SELECT fwg.film_work_id, fwg.genre_id, g.genre AS genre_name
       FROM film_work_genre fwg
       JOIN genre g ON g.id = fwg.genre_id
      WHERE fwg.genre_id = ANY($1)";

pub(crate) const PERSON_LINKS_FOR_FILMS: &str = "SELECT fwp.film_work_id, fwp.person_id, p.name AS full_name, fwp.job
       FROM film_work_person fwp
       JOIN person p ON p.id = fwp.person_id
      WHERE fwp.film_work_id = ANY($1)";

pub(crate) const PERSON_LINKS_FOR_PERSONS: &str = "SELECT fwp.film_work_id, fwp.person_id, p.name AS full_name, fwp.job
       FROM film_work_person fwp
       JOIN person p ON p.id = fwp.person_id
      WHERE fwp.person_id = ANY($1)";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_query_orders_oldest_first_with_id_tiebreak() {
        let sql = stale_entities(EntityKind::FilmWork);
        assert!(sql.contains("FROM film_work e"));
        assert!(sql.contains("ORDER BY last_modified ASC, id ASC"));
        assert!(sql.contains("last_modified > indexed_at"));
        assert!(sql.contains("film_work_person"));
        assert!(sql.contains("film_work_genre"));
    }

    #[test]
    fn test_person_staleness_includes_join_rows() {
        let sql = stale_entities(EntityKind::Person);
        assert!(sql.contains("FROM person e"));
        assert!(sql.contains("fwp.person_id = e.id"));
    }

    #[test]
    fn test_genre_name_reads_the_genre_column() {
        assert!(GENRES.contains("genre AS name"));
        for sql in [GENRE_LINKS_FOR_FILMS, GENRE_LINKS_FOR_GENRES] {
            assert!(sql.contains("g.genre AS genre_name"));
            assert!(!sql.contains("g.name"));
        }
        for sql in [PERSONS, PERSON_LINKS_FOR_FILMS, PERSON_LINKS_FOR_PERSONS] {
            assert!(sql.contains("name AS full_name"));
        }
    }

    #[test]
    fn test_stamp_is_forward_only_and_leaves_modified_alone() {
        let sql = stamp_indexed(EntityKind::Genre);
        assert_eq!(
            sql,
            "UPDATE genre SET indexed_at = GREATEST(indexed_at, $1) WHERE id = ANY($2)"
        );
        assert!(!sql.contains("modified"));
    }
}
