//! Error types for tracko
//!
//! Each layer has its own error enum; `ImportError` is what the import
//! workers report on the shared error channel.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the state store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to connect to database at {location}: {source}")]
    Connect {
        location: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Tracked repository {0} not found after insert")]
    MissingRepository(String),

    #[error("State database schema version {found} is not supported (expected {supported} or older)")]
    UnsupportedSchema { found: String, supported: String },
}

/// Errors raised by a commit source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Repository path is empty")]
    EmptyPath,

    #[error("Cannot resolve repository path {path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors reported by the import pipeline
///
/// Scanner errors are isolated to one repository; `Persistence` halts the
/// batch writer; `StoreUnavailable` aborts the run before any worker starts.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to open repository {}: {source}", path.display())]
    RepositoryOpen {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("Failed to read history of {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("Failed to look up tracked repository {}: {source}", path.display())]
    RepositoryLookup {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Failed to persist commit batch: {0}")]
    Persistence(#[source] StoreError),

    #[error("State store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("Import worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Import was cancelled")]
    Cancelled,
}

/// Errors related to the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration is not initialized at {}, run 'tracko config init'", .0.display())]
    NotInitialized(PathBuf),

    #[error("Could not determine the user configuration directory")]
    NoConfigDir,

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Unknown configuration field '{0}'")]
    UnknownField(String),

    #[error("Field '{0}' is restricted and cannot be modified")]
    RestrictedField(String),

    #[error("{} is not a git repository", .0.display())]
    NotAGitRepository(PathBuf),

    #[error("Repository {} is already tracked", .0.display())]
    AlreadyTracked(PathBuf),

    #[error("Repository {} is not tracked", .0.display())]
    NotTracked(PathBuf),
}
