//! OpenSearch index configuration and mappings.
//!
//! Each entity kind has its own index with a strict mapping. All indices share
//! the `ru_en` analyzer so titles and names are searchable in both languages.

use serde_json::{json, Value};

use movies_indexer_shared::EntityKind;

/// Shared index settings: shards, refresh interval and the `ru_en` analyzer.
fn index_settings() -> Value {
    json!({
        "number_of_shards": 1,
        "number_of_replicas": 1,
        "refresh_interval": "1s",
        "analysis": {
            "filter": {
                "english_stop": { "type": "stop", "stopwords": "_english_" },
                "english_stemmer": { "type": "stemmer", "language": "english" },
                "english_possessive_stemmer": { "type": "stemmer", "language": "possessive_english" },
                "russian_stop": { "type": "stop", "stopwords": "_russian_" },
                "russian_stemmer": { "type": "stemmer", "language": "russian" }
            },
            "analyzer": {
                "ru_en": {
                    "tokenizer": "standard",
                    "filter": [
                        "lowercase",
                        "english_stop",
                        "english_stemmer",
                        "english_possessive_stemmer",
                        "russian_stop",
                        "russian_stemmer"
                    ]
                }
            }
        }
    })
}

/// A nested `{id, name}` reference.
fn named_ref() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": { "type": "keyword" },
            "name": { "type": "text", "analyzer": "ru_en" }
        }
    })
}

fn movie_properties() -> Value {
    json!({
        "id": { "type": "keyword" },
        "title": {
            "type": "text",
            "analyzer": "ru_en",
            "fields": { "raw": { "type": "keyword" } }
        },
        "description": { "type": "text", "analyzer": "ru_en" },
        "imdb_rating": { "type": "float" },
        "film_type": { "type": "keyword" },
        "release_date": { "type": "date" },
        "genres": named_ref(),
        "genres_names": { "type": "keyword" },
        "actors": named_ref(),
        "actors_names": { "type": "text", "analyzer": "ru_en" },
        "directors": named_ref(),
        "directors_names": { "type": "text", "analyzer": "ru_en" },
        "writers": named_ref(),
        "writers_names": { "type": "text", "analyzer": "ru_en" }
    })
}

fn person_properties() -> Value {
    json!({
        "id": { "type": "keyword" },
        "full_name": {
            "type": "text",
            "analyzer": "ru_en",
            "fields": { "raw": { "type": "keyword" } }
        },
        "roles": { "type": "keyword" },
        "film_ids": { "type": "keyword" }
    })
}

fn genre_properties() -> Value {
    json!({
        "id": { "type": "keyword" },
        "name": {
            "type": "text",
            "analyzer": "ru_en",
            "fields": { "raw": { "type": "keyword" } }
        },
        "description": { "type": "text", "analyzer": "ru_en" },
        "film_count": { "type": "integer" }
    })
}

/// Get the index settings and mappings for the index of `kind`.
///
/// Mappings are `strict`: a document carrying an unknown field is rejected by
/// the engine instead of silently widening the schema.
pub fn get_index_settings(kind: EntityKind) -> Value {
    let properties = match kind {
        EntityKind::FilmWork => movie_properties(),
        EntityKind::Person => person_properties(),
        EntityKind::Genre => genre_properties(),
    };

    json!({
        "settings": index_settings(),
        "mappings": {
            "dynamic": "strict",
            "properties": properties
        }
    })
}
