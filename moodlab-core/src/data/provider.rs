//! Data source descriptors, load errors and progress reporting.
//!
//! A source is either a local file or an HTTP(S) URL. Errors are structured
//! so they display the same in the CLI and in an interactive front end.

use super::schema::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Where a table comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    /// Interpret a user-supplied location: anything with an http(s) scheme is a URL.
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::File(PathBuf::from(trimmed))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, DataSource::Url(_))
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

/// Which of the two input tables an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    Trades,
    Sentiment,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Trades => f.write_str("trades"),
            TableKind::Sentiment => f.write_str("sentiment"),
        }
    }
}

/// Fatal loading errors. Any of these ends the session.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source unreachable: {location}: {reason}")]
    Unreachable { location: String, reason: String },

    #[error("failed to read {location}: {reason}")]
    Read { location: String, reason: String },

    #[error("{location}: {source}")]
    Schema {
        location: String,
        #[source]
        source: SchemaError,
    },

    #[error("{location}: no valid rows ({rejected} rejected)")]
    NoValidRows { location: String, rejected: usize },

    /// An already-typed record that breaks a table rule.
    #[error("{table} record {index}: {reason}")]
    InvalidRecord {
        table: TableKind,
        index: usize,
        reason: String,
    },
}

/// Progress callback for the session-start load.
///
/// Remote fetches can take a while; front ends use this to show a loading state.
pub trait LoadProgress {
    /// Called when starting to load a table.
    fn on_start(&self, table: TableKind, source: &DataSource);

    /// Called when a table finished loading (successfully or not).
    fn on_complete(&self, table: TableKind, result: &Result<usize, String>);
}

/// Progress reporter that emits tracing events.
pub struct LogProgress;

impl LoadProgress for LogProgress {
    fn on_start(&self, table: TableKind, source: &DataSource) {
        if source.is_remote() {
            tracing::info!(%table, %source, "fetching remote table (this may take a while)");
        } else {
            tracing::info!(%table, %source, "loading table");
        }
    }

    fn on_complete(&self, table: TableKind, result: &Result<usize, String>) {
        match result {
            Ok(rows) => tracing::info!(%table, rows, "table loaded"),
            Err(e) => tracing::error!(%table, error = %e, "table failed to load"),
        }
    }
}

/// Progress reporter that does nothing (tests, embedding).
pub struct SilentProgress;

impl LoadProgress for SilentProgress {
    fn on_start(&self, _table: TableKind, _source: &DataSource) {}
    fn on_complete(&self, _table: TableKind, _result: &Result<usize, String>) {}
}
