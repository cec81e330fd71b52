//! Error types for rule loading, record resolution and materialization.
//!
//! Only [`RuleLoadError`] and [`StoreError`] ever reach a caller as `Err`.
//! [`ResolutionFailure`] travels inside a `MappingOutcome`, and per-row
//! [`StoreError::Materialization`] failures are counted, not returned.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleLoadError {
    #[error("cannot read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported rule file format: {path} (expected .toon or .json)")]
    UnsupportedFormat { path: PathBuf },

    #[error("malformed rule file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("invalid regex '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{key}' maps to an empty canonical value")]
    EmptyCanonical { key: String },
}

/// Why a record was handed the full fallback mapping.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionFailure {
    #[error("resolver panicked during {stage}: {message}")]
    Panicked { stage: &'static str, message: String },

    #[error("{what} resolved to an empty canonical value")]
    EmptyCanonical { what: &'static str },

    #[error("confidence {0} is not a finite number")]
    InvalidConfidence(f64),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to persist component '{raw_symbol}' from table '{table}': {source}")]
    Materialization {
        table: String,
        raw_symbol: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("category '{0}' is missing from the category table")]
    MissingCategory(String),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("cannot write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}
