//! Document transformer implementation.
//!
//! Maps extracted rows to index documents and validates their shape.

use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use movies_indexer_shared::{
    Credits, ExtractedRows, FilmWorkRow, GenreDocument, GenreRow, MovieDocument, NamedRef,
    PersonDocument, PersonJob, PersonRow, SearchDocument,
};

/// A row that cannot become a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("entity {entity_id}: invalid {field}: {reason}")]
pub struct ValidationError {
    pub entity_id: Uuid,
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(entity_id: Uuid, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            entity_id,
            field,
            reason: reason.into(),
        }
    }
}

/// Result of transforming one batch.
#[derive(Debug, Default)]
pub struct TransformOutput {
    /// Valid documents, in batch order.
    pub documents: Vec<SearchDocument>,
    /// Rows left out of the batch.
    pub skipped: Vec<ValidationError>,
}

impl TransformOutput {
    pub fn skipped_ids(&self) -> Vec<Uuid> {
        self.skipped.iter().map(|e| e.entity_id).collect()
    }
}

fn require_id(id: Uuid) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::new(id, "id", "nil uuid"));
    }
    Ok(())
}

fn require_text(id: Uuid, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(id, field, "blank"));
    }
    Ok(())
}

fn names(refs: &[NamedRef]) -> Vec<String> {
    refs.iter().map(|r| r.name.clone()).collect()
}

/// The document fields holding people with `job`.
fn credit_fields(
    doc: &mut MovieDocument,
    job: PersonJob,
) -> (&mut Vec<NamedRef>, &mut Vec<String>) {
    match job {
        PersonJob::Actor => (&mut doc.actors, &mut doc.actors_names),
        PersonJob::Director => (&mut doc.directors, &mut doc.directors_names),
        PersonJob::Writer => (&mut doc.writers, &mut doc.writers_names),
    }
}

/// Transformer that turns extracted rows into search documents.
///
/// Transformation is pure. A row that fails validation is logged and left
/// out; the rest of the batch is unaffected.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentTransformer;

impl DocumentTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Transform a batch of extracted rows.
    #[instrument(skip(self, rows), fields(entity = %rows.kind(), count = rows.len()))]
    pub fn transform(&self, rows: &ExtractedRows) -> TransformOutput {
        let results: Vec<Result<SearchDocument, ValidationError>> = match rows {
            ExtractedRows::FilmWorks(rows) => rows
                .iter()
                .map(|row| self.movie(row).map(SearchDocument::Movie))
                .collect(),
            ExtractedRows::Persons(rows) => rows
                .iter()
                .map(|row| self.person(row).map(SearchDocument::Person))
                .collect(),
            ExtractedRows::Genres(rows) => rows
                .iter()
                .map(|row| self.genre(row).map(SearchDocument::Genre))
                .collect(),
        };

        let mut output = TransformOutput::default();
        for result in results {
            match result {
                Ok(doc) => output.documents.push(doc),
                Err(e) => {
                    warn!(
                        entity_id = %e.entity_id,
                        field = e.field,
                        reason = %e.reason,
                        "Skipping invalid row"
                    );
                    output.skipped.push(e);
                }
            }
        }

        debug!(
            documents = output.documents.len(),
            skipped = output.skipped.len(),
            "Transformed batch"
        );
        output
    }

    /// Build a movie document.
    pub fn movie(&self, row: &FilmWorkRow) -> Result<MovieDocument, ValidationError> {
        let record = &row.record;
        require_id(record.id)?;
        require_text(record.id, "title", &record.title)?;
        if let Some(rating) = record.imdb_rating {
            if !rating.is_finite() {
                return Err(ValidationError::new(
                    record.id,
                    "imdb_rating",
                    format!("not a finite number: {}", rating),
                ));
            }
        }

        let mut doc = MovieDocument {
            id: record.id,
            title: record.title.clone(),
            description: record.description.clone().unwrap_or_default(),
            imdb_rating: record.imdb_rating,
            film_type: record.film_type.clone(),
            release_date: record.creation_date,
            genres: row.genres.clone(),
            genres_names: names(&row.genres),
            actors: Vec::new(),
            actors_names: Vec::new(),
            directors: Vec::new(),
            directors_names: Vec::new(),
            writers: Vec::new(),
            writers_names: Vec::new(),
        };
        apply_credits(&mut doc, &row.credits);

        Ok(doc)
    }

    /// Build a person document.
    pub fn person(&self, row: &PersonRow) -> Result<PersonDocument, ValidationError> {
        let record = &row.record;
        require_id(record.id)?;
        require_text(record.id, "full_name", &record.full_name)?;

        Ok(PersonDocument {
            id: record.id,
            full_name: record.full_name.clone(),
            roles: row.roles.iter().map(|job| job.as_str().to_string()).collect(),
            film_ids: row.film_ids.clone(),
        })
    }

    /// Build a genre document.
    pub fn genre(&self, row: &GenreRow) -> Result<GenreDocument, ValidationError> {
        let record = &row.record;
        require_id(record.id)?;
        require_text(record.id, "name", &record.name)?;

        Ok(GenreDocument {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            film_count: row.film_count,
        })
    }
}

fn apply_credits(doc: &mut MovieDocument, credits: &Credits) {
    for job in PersonJob::ALL {
        let people = credits.for_job(job);
        let (refs, refs_names) = credit_fields(doc, job);
        *refs = people.to_vec();
        *refs_names = names(people);
    }
}
