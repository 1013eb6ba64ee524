//! Error types. Only genuine access failures are errors; empty corpora and
//! unknown anchors travel as `Outcome` variants instead.

use thiserror::Error;

/// Failure to read from the interaction store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query {op} failed: {reason}")]
    Query { op: &'static str, reason: String },

    #[error("dataset io: {0}")]
    Io(String),

    #[error("dataset parse: {0}")]
    Parse(String),
}

impl StoreError {
    pub fn query(op: &'static str, reason: impl Into<String>) -> Self {
        Self::Query { op, reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("config parse: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Crate-level error for loaders and the binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type StoreResult<T> = Result<T, StoreError>;
