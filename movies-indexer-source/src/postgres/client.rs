//! PostgreSQL source client.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::errors::SourceError;
use crate::interfaces::RelationalSource;
use crate::postgres::queries;
use movies_indexer_shared::{
    EntityKind, FilmWorkRecord, GenreLink, GenreRecord, PersonJob, PersonLink, PersonRecord,
    StaleEntity, WATERMARK_EPOCH,
};

/// Connection settings for the PostgreSQL source.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Schema put on the `search_path`.
    pub schema: String,
    pub max_connections: u32,
    /// How long to wait for a pooled connection.
    pub acquire_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: String::new(),
            password: String::new(),
            database: "movies".to_string(),
            schema: "content".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(FromRow)]
struct StaleRow {
    id: Uuid,
    last_modified: DateTime<Utc>,
}

#[derive(FromRow)]
struct FilmWorkDbRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    creation_date: Option<NaiveDate>,
    imdb_rating: Option<f64>,
    film_rating: Option<String>,
    film_type: Option<String>,
}

#[derive(FromRow)]
struct PersonDbRow {
    id: Uuid,
    full_name: String,
}

#[derive(FromRow)]
struct GenreDbRow {
    id: Uuid,
    name: String,
    description: Option<String>,
}

#[derive(FromRow)]
struct GenreLinkDbRow {
    film_work_id: Uuid,
    genre_id: Uuid,
    genre_name: String,
}

#[derive(FromRow)]
struct PersonLinkDbRow {
    film_work_id: Uuid,
    person_id: Uuid,
    full_name: String,
    job: String,
}

/// Relational source backed by a PostgreSQL connection pool.
///
/// The pool is shared by all entity pipelines; `PgPool` is cheap to clone.
#[derive(Clone)]
pub struct PostgresSource {
    pool: PgPool,
}

impl PostgresSource {
    /// Connect to the database described by `config`.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, SourceError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .options([("search_path", config.schema.as_str())]);

        debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            schema = %config.schema,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| SourceError::connection(e.to_string()))?;

        info!(host = %config.host, database = %config.database, "Connected to PostgreSQL");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check that the database answers queries.
    pub async fn health_check(&self) -> Result<(), SourceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_person_links(
        &self,
        sql: &'static str,
        ids: &[Uuid],
    ) -> Result<Vec<PersonLink>, SourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PersonLinkDbRow>(sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().filter_map(person_link_from_row).collect())
    }

    async fn fetch_genre_links(
        &self,
        sql: &'static str,
        ids: &[Uuid],
    ) -> Result<Vec<GenreLink>, SourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, GenreLinkDbRow>(sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| GenreLink {
                film_work_id: row.film_work_id,
                genre_id: row.genre_id,
                genre_name: row.genre_name,
            })
            .collect())
    }
}

/// Links with a job outside the known set are dropped.
fn person_link_from_row(row: PersonLinkDbRow) -> Option<PersonLink> {
    match row.job.parse::<PersonJob>() {
        Ok(job) => Some(PersonLink {
            film_work_id: row.film_work_id,
            person_id: row.person_id,
            full_name: row.full_name,
            job,
        }),
        Err(e) => {
            warn!(
                film_work_id = %row.film_work_id,
                person_id = %row.person_id,
                error = %e,
                "Ignoring person link with unknown job"
            );
            None
        }
    }
}

#[async_trait]
impl RelationalSource for PostgresSource {
    #[instrument(skip(self, exclude), fields(entity = %kind, excluded = exclude.len()))]
    async fn stale_entities(
        &self,
        kind: EntityKind,
        limit: usize,
        exclude: &[Uuid],
    ) -> Result<Vec<StaleEntity>, SourceError> {
        let limit = i64::try_from(limit)
            .map_err(|_| SourceError::invalid_data(format!("batch limit {} too large", limit)))?;
        let sql = queries::stale_entities(kind);

        let rows = sqlx::query_as::<_, StaleRow>(&sql)
            .bind(limit)
            .bind(exclude)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Detected stale entities");

        Ok(rows
            .into_iter()
            .map(|row| StaleEntity {
                id: row.id,
                last_modified: row.last_modified,
            })
            .collect())
    }

    async fn film_works(&self, ids: &[Uuid]) -> Result<Vec<FilmWorkRecord>, SourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, FilmWorkDbRow>(queries::FILM_WORKS)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| FilmWorkRecord {
                id: row.id,
                title: row.title,
                description: row.description,
                creation_date: row.creation_date,
                imdb_rating: row.imdb_rating,
                film_rating: row.film_rating,
                film_type: row.film_type,
            })
            .collect())
    }

    async fn genre_links_for_films(&self, film_ids: &[Uuid]) -> Result<Vec<GenreLink>, SourceError> {
        self.fetch_genre_links(queries::GENRE_LINKS_FOR_FILMS, film_ids)
            .await
    }

    async fn person_links_for_films(
        &self,
        film_ids: &[Uuid],
    ) -> Result<Vec<PersonLink>, SourceError> {
        self.fetch_person_links(queries::PERSON_LINKS_FOR_FILMS, film_ids)
            .await
    }

    async fn persons(&self, ids: &[Uuid]) -> Result<Vec<PersonRecord>, SourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PersonDbRow>(queries::PERSONS)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PersonRecord {
                id: row.id,
                full_name: row.full_name,
            })
            .collect())
    }

    async fn person_links_for_persons(
        &self,
        person_ids: &[Uuid],
    ) -> Result<Vec<PersonLink>, SourceError> {
        self.fetch_person_links(queries::PERSON_LINKS_FOR_PERSONS, person_ids)
            .await
    }

    async fn genres(&self, ids: &[Uuid]) -> Result<Vec<GenreRecord>, SourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, GenreDbRow>(queries::GENRES)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| GenreRecord {
                id: row.id,
                name: row.name,
                description: row.description,
            })
            .collect())
    }

    async fn genre_links_for_genres(
        &self,
        genre_ids: &[Uuid],
    ) -> Result<Vec<GenreLink>, SourceError> {
        self.fetch_genre_links(queries::GENRE_LINKS_FOR_GENRES, genre_ids)
            .await
    }

    #[instrument(skip(self, ids), fields(entity = %kind, count = ids.len()))]
    async fn stamp_indexed(
        &self,
        kind: EntityKind,
        ids: &[Uuid],
        indexed_at: DateTime<Utc>,
    ) -> Result<u64, SourceError> {
        if ids.is_empty() {
            return Ok(0);
        }

        // One statement, so the batch is stamped entirely or not at all.
        let sql = queries::stamp_indexed(kind);
        let result = sqlx::query(&sql)
            .bind(indexed_at)
            .bind(ids)
            .execute(&self.pool)
            .await?;

        debug!(updated = result.rows_affected(), "Stamped indexed_at");
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(entity = %kind))]
    async fn reset_watermarks(&self, kind: EntityKind) -> Result<u64, SourceError> {
        let sql = queries::reset_watermarks(kind);
        let result = sqlx::query(&sql)
            .bind(WATERMARK_EPOCH)
            .execute(&self.pool)
            .await?;

        info!(updated = result.rows_affected(), "Reset watermarks");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_job_link_is_dropped() {
        let row = PersonLinkDbRow {
            film_work_id: Uuid::new_v4(),
            person_id: Uuid::new_v4(),
            full_name: "Someone".to_string(),
            job: "producer".to_string(),
        };
        assert!(person_link_from_row(row).is_none());
    }

    #[test]
    fn test_known_job_link_is_kept() {
        let film_work_id = Uuid::new_v4();
        let row = PersonLinkDbRow {
            film_work_id,
            person_id: Uuid::new_v4(),
            full_name: "Someone".to_string(),
            job: "writer".to_string(),
        };

        let link = person_link_from_row(row).unwrap();
        assert_eq!(link.job, PersonJob::Writer);
        assert_eq!(link.film_work_id, film_work_id);
    }

    #[test]
    fn test_default_config() {
        let config = PostgresConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.schema, "content");
        assert_eq!(config.database, "movies");
    }
}
