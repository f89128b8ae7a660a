//! Settings read from the environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::IndexingError;
use movies_indexer_pipeline::{LoaderConfig, OrchestratorConfig};
use movies_indexer_repository::OpenSearchConfig;
use movies_indexer_shared::EntityKind;
use movies_indexer_source::PostgresConfig;

/// Default number of entities per batch.
const DEFAULT_BATCH_SIZE: usize = 50;

/// Default entity pipelines, in run order.
const DEFAULT_ENTITIES: &str = "movies,persons,genres";

/// Default database round-trip timeout, in seconds.
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;

/// Default search engine host.
const DEFAULT_ES_HOST: &str = "localhost";

/// Default search engine port.
const DEFAULT_ES_PORT: u16 = 9200;

/// Default number of bulk attempts before giving up.
const DEFAULT_ES_MAX_RECONNECTIONS: u32 = 10;

/// Default bulk request timeout, in seconds.
const DEFAULT_ES_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_POSTGRES_HOST: &str = "localhost";
const DEFAULT_POSTGRES_PORT: u16 = 5432;
const DEFAULT_POSTGRES_DB: &str = "movies";
const DEFAULT_POSTGRES_SCHEMA: &str = "content";
const DEFAULT_POSTGRES_MAX_CONNECTIONS: u32 = 5;

/// Output format of the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = IndexingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(IndexingError::config(format!(
                "LOG_FORMAT must be pretty or json, got {}",
                other
            ))),
        }
    }
}

impl LogFormat {
    /// Read `LOG_FORMAT` from the process environment.
    pub fn from_env() -> Result<Self, IndexingError> {
        env::var("LOG_FORMAT")
            .ok()
            .map_or(Ok(LogFormat::default()), |v| v.parse())
    }
}

/// Indexer settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub batch_size: usize,
    pub entities: Vec<EntityKind>,
    pub concurrent: bool,
    pub db_timeout: Duration,
    pub max_reconnections: u32,
    pub opensearch: OpenSearchConfig,
    pub postgres: PostgresConfig,
    pub log_format: LogFormat,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `ETL_BATCH_SIZE`: Entities per batch (default: 50)
    /// - `ETL_ENTITIES`: Pipelines to run (default: movies,persons,genres)
    /// - `ETL_CONCURRENT`: Run pipelines concurrently (default: false)
    /// - `ETL_DB_TIMEOUT_SECS`: Database round-trip timeout (default: 30)
    /// - `ES_HOST`, `ES_PORT`: Search engine endpoint (default: localhost:9200)
    /// - `ES_MAX_RECONNECTIONS`: Bulk attempts before giving up (default: 10)
    /// - `ES_REQUEST_TIMEOUT_SECS`: Bulk request timeout (default: 30)
    /// - `POSTGRES_USER`, `POSTGRES_PASSWORD`: Required credentials
    /// - `POSTGRES_HOST`, `POSTGRES_PORT`, `POSTGRES_DB`, `POSTGRES_SCHEMA`,
    ///   `POSTGRES_MAX_CONNECTIONS`: Database connection (default:
    ///   localhost:5432/movies, schema content, 5 connections)
    /// - `LOG_FORMAT`: pretty or json (default: pretty)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the value of a variable
    /// if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let batch_size = vars.parse("ETL_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(IndexingError::config("ETL_BATCH_SIZE must be at least 1"));
        }

        let entities = parse_entities(
            &vars
                .get("ETL_ENTITIES")
                .unwrap_or_else(|| DEFAULT_ENTITIES.to_string()),
        )?;

        let max_reconnections = vars.parse("ES_MAX_RECONNECTIONS", DEFAULT_ES_MAX_RECONNECTIONS)?;
        if max_reconnections == 0 {
            return Err(IndexingError::config("ES_MAX_RECONNECTIONS must be at least 1"));
        }

        let db_timeout =
            Duration::from_secs(vars.parse("ETL_DB_TIMEOUT_SECS", DEFAULT_DB_TIMEOUT_SECS)?);

        let opensearch = OpenSearchConfig {
            host: vars.get_or("ES_HOST", DEFAULT_ES_HOST),
            port: vars.parse("ES_PORT", DEFAULT_ES_PORT)?,
            request_timeout: Duration::from_secs(
                vars.parse("ES_REQUEST_TIMEOUT_SECS", DEFAULT_ES_REQUEST_TIMEOUT_SECS)?,
            ),
        };

        let postgres = PostgresConfig {
            host: vars.get_or("POSTGRES_HOST", DEFAULT_POSTGRES_HOST),
            port: vars.parse("POSTGRES_PORT", DEFAULT_POSTGRES_PORT)?,
            user: vars.require("POSTGRES_USER")?,
            password: vars.require("POSTGRES_PASSWORD")?,
            database: vars.get_or("POSTGRES_DB", DEFAULT_POSTGRES_DB),
            schema: vars.get_or("POSTGRES_SCHEMA", DEFAULT_POSTGRES_SCHEMA),
            max_connections: vars.parse("POSTGRES_MAX_CONNECTIONS", DEFAULT_POSTGRES_MAX_CONNECTIONS)?,
            acquire_timeout: db_timeout,
        };

        Ok(Self {
            batch_size,
            entities,
            concurrent: vars.parse_bool("ETL_CONCURRENT", false)?,
            db_timeout,
            max_reconnections,
            opensearch,
            postgres,
            log_format: vars.get("LOG_FORMAT").map_or(Ok(LogFormat::default()), |v| v.parse())?,
        })
    }

    /// Orchestrator configuration for a sync run.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            entities: self.entities.clone(),
            batch_size: self.batch_size,
            concurrent: self.concurrent,
            db_timeout: self.db_timeout,
            loader: LoaderConfig {
                max_retries: self.max_reconnections,
                ..LoaderConfig::default()
            },
        }
    }
}

/// Parse a comma-separated list of entity kinds, dropping repeats.
fn parse_entities(raw: &str) -> Result<Vec<EntityKind>, IndexingError> {
    let mut kinds = Vec::new();

    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let kind: EntityKind = name
            .parse()
            .map_err(|e| IndexingError::config(format!("ETL_ENTITIES: {}", e)))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    if kinds.is_empty() {
        return Err(IndexingError::config("ETL_ENTITIES names no entity"));
    }
    Ok(kinds)
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// A set, non-blank variable.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn require(&self, key: &str) -> Result<String, IndexingError> {
        self.get(key)
            .ok_or_else(|| IndexingError::config(format!("{} is required", key)))
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, IndexingError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            Some(value) => value.trim().parse().map_err(|e| {
                IndexingError::config(format!("{}={:?} is invalid: {}", key, value, e))
            }),
            None => Ok(default),
        }
    }

    fn parse_bool(&self, key: &str, default: bool) -> Result<bool, IndexingError> {
        match self.get(key).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(default),
            Some(v) => match v.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(IndexingError::config(format!("{}={:?} is not a boolean", key, v))),
            },
        }
    }
}
