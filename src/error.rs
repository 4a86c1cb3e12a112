//! Error and warning types shared by every stage of the enrichment pipeline.

use std::path::PathBuf;

use serde::Serialize;

/// Errors raised while loading, validating, scoring or exporting.
#[derive(thiserror::Error, Debug)]
pub enum EnrichmentError {
    /// Malformed background, library, alias or input text.
    #[error("{source_name}:{line} {message}")]
    Format {
        source_name: String,
        line: usize,
        message: String,
    },
    /// Nothing usable remained in the input after cleaning.
    #[error("invalid input gene set: {0}")]
    Validation(String),
    /// A contingency table or statistical precondition was violated.
    #[error("domain error: {0}")]
    Domain(String),
    /// Writing results failed.
    #[error("could not export to {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Serialization of results failed before anything reached disk.
    #[error("could not serialize results: {0}")]
    Serialize(String),
    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EnrichmentError {
    pub(crate) fn format(source_name: &str, line: usize, message: impl Into<String>) -> Self {
        EnrichmentError::Format {
            source_name: source_name.to_owned(),
            line,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for EnrichmentError {
    fn from(err: csv::Error) -> Self {
        EnrichmentError::Serialize(err.to_string())
    }
}

impl From<serde_json::Error> for EnrichmentError {
    fn from(err: serde_json::Error) -> Self {
        EnrichmentError::Serialize(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EnrichmentError>;

/// Non-fatal statistical warnings attached to a single result.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainWarning {
    /// Chi-squared approximation with an expected cell count below 1.
    #[error("chi-squared approximation unreliable (min expected count {min_expected:.3})")]
    UnreliableApproximation { min_expected: f64 },
    /// A row or column margin is empty, the statistic is undefined.
    #[error("empty margin in contingency table, statistic undefined")]
    EmptyMargin,
}
