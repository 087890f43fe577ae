//! Error types for facility-matrix library
//!
//! Per-pair query failures never show up here: they are absorbed into
//! sentinel values by the classifier. Everything below aborts a run.

use std::fmt;
use std::path::PathBuf;

/// Main error type for facility-matrix operations
#[derive(Debug)]
pub enum Error {
    /// File I/O error (checkpoint log, inputs, matrix output)
    IoError(std::io::Error),

    /// Delimited-text read or write failure
    CsvError(csv::Error),

    /// Invalid input data or parameters
    InvalidInput(String),

    /// Missing or malformed configuration value
    ConfigError(String),

    /// Checkpoint log contains a record that cannot be interpreted
    CorruptLog {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// A grid cell has no recorded result at assembly time
    MissingResult { row: usize, col: usize },

    /// Requested boundary feature is absent from the GeoJSON collection
    BoundaryNotFound(String),

    /// HTTP-specific error
    HttpError(String),

    /// Network connectivity issues
    NetworkError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => {
                write!(f, "I/O error: {}", err)
            }
            Error::CsvError(err) => {
                write!(f, "CSV error: {}", err)
            }
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {}", msg)
            }
            Error::ConfigError(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            Error::CorruptLog { path, line, reason } => {
                write!(
                    f,
                    "Checkpoint log '{}' is corrupt at line {}: {}",
                    path.display(),
                    line,
                    reason
                )
            }
            Error::MissingResult { row, col } => {
                write!(
                    f,
                    "No result recorded for origin {} / destination {}; refusing to write a partial matrix",
                    row, col
                )
            }
            Error::BoundaryNotFound(name) => {
                write!(f, "Boundary '{}' not found in feature collection", name)
            }
            Error::HttpError(msg) => {
                write!(f, "HTTP error: {}", msg)
            }
            Error::NetworkError(msg) => {
                write!(f, "Network error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            Error::CsvError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::CsvError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::NetworkError(err.to_string())
        } else {
            Error::HttpError(err.to_string())
        }
    }
}

/// Convenience result type for facility-matrix operations
pub type Result<T> = std::result::Result<T, Error>;
