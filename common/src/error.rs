use crate::models::SourceKind;
use thiserror::Error;

/// Failure to fetch one upstream page.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error fetching {kind}: {source}")]
    Http {
        kind: SourceKind,
        #[source]
        source: reqwest::Error,
    },
    #[error("upstream returned {status} for {kind} ({url})")]
    Status {
        kind: SourceKind,
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("malformed {kind} response: {reason}")]
    Envelope { kind: SourceKind, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Why a single upstream item could not become a record.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("invalid item: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Decode(String),
    #[error("unsupported store URL: {0}")]
    UnsupportedUrl(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
