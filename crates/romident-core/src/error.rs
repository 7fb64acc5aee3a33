use crate::digest::DigestKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("DAT error in {}: {message}", .path.display())]
    Dat { path: PathBuf, message: String },

    #[error("Invalid {kind} digest '{value}'")]
    InvalidDigest { kind: DigestKind, value: String },

    /// Two database records share a non-empty digest. Fatal at load time.
    #[error("Database integrity error: {kind} {value} is claimed by both '{first}' and '{second}'")]
    DatabaseIntegrity {
        kind: DigestKind,
        value: String,
        first: String,
        second: String,
    },

    #[error("Report error: {0}")]
    Report(String),
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Report(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Report(err.to_string())
    }
}

/// A planned rename that cannot go ahead. Attached to the plan entry it
/// belongs to; never aborts a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("{} is already the destination of {}", .destination.display(), .claimed_by.display())]
    DuplicateDestination {
        destination: PathBuf,
        claimed_by: PathBuf,
    },

    #[error("{} already exists", .destination.display())]
    DestinationExists { destination: PathBuf },

    #[error("template '{template}' produced unusable file name '{rendered}'")]
    InvalidTarget { template: String, rendered: String },
}

pub type Result<T> = std::result::Result<T, Error>;
