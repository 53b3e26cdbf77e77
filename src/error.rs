//! Error types for migration generation.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a generation run.
///
/// None of these are retried: they all point at misconfiguration or at a
/// schema that no longer matches what the caller assumed.
#[derive(Debug, Error)]
pub enum Error {
    // Configuration
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no languages configured (set `languages` in the config file)")]
    MissingLanguages,

    #[error("no source language configured (set `source_language` in the config file)")]
    MissingSourceLanguage,

    #[error("language `{0}` is configured more than once")]
    DuplicateLanguage(String),

    #[error("unsupported database url scheme `{0}` (expected mysql:// or postgres://)")]
    UnsupportedDatabase(String),

    #[error("configured dialect `{configured}` does not match database url scheme `{url}`")]
    DialectMismatch { configured: String, url: String },

    #[error("no database url given (use --database-url, DATABASE_URL or --schema)")]
    MissingDatabaseUrl,

    #[error("migration directory {} does not exist, create it first", .0.display())]
    DestinationMissing(PathBuf),

    // Model descriptors
    #[error("invalid model descriptor for table `{table}`: {reason}")]
    InvalidDescriptor { table: String, reason: String },

    #[error("failed to load model manifest {}: {reason}", .path.display())]
    ModelManifest { path: PathBuf, reason: String },

    // Inspection
    #[error("schema unavailable for table `{table}`: {reason}")]
    SchemaUnavailable { table: String, reason: String },

    #[error("column `{table}.{column}` not found")]
    NotFound { table: String, column: String },

    // Planning
    #[error(
        "no source column for `{table}.{attribute}` (neither `{attribute}` nor `{qualified}` exists)"
    )]
    NoSourceColumn {
        table: String,
        attribute: String,
        qualified: String,
    },

    #[error(
        "column `{table}.{column}` is part of composite foreign key `{constraint}`, which cannot be re-attached per language"
    )]
    CompositeForeignKey {
        table: String,
        column: String,
        constraint: String,
    },

    #[error(
        "column `{table}.{column}` carries several foreign keys ({}), which cannot be moved or replicated together",
        .constraints.join(", ")
    )]
    MultipleForeignKeys {
        table: String,
        column: String,
        constraints: Vec<String>,
    },

    #[error("cannot apply operation to `{table}`: {reason}")]
    Simulation { table: String, reason: String },

    #[error("rollback check failed: {0}")]
    RollbackCheck(String),

    // Emission
    #[error("schema already up to date")]
    EmptyPlan,

    #[error("failed to write migration {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this is the informational "nothing to do" outcome rather than a failure.
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Error::EmptyPlan)
    }

    pub(crate) fn unavailable(table: &str, reason: impl std::fmt::Display) -> Self {
        Error::SchemaUnavailable {
            table: table.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn simulation(table: &str, reason: impl Into<String>) -> Self {
        Error::Simulation {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}
