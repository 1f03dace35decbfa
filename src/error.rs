use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum M4dbError {
    #[error("'{0}' is not a valid unique id")]
    #[diagnostic(help("expected 8-4-4-4-12 hexadecimal digits, e.g. 0f86b938-15a3-4f1e-99b1-8f2b65b37a03"))]
    InvalidUidFormat(String),

    #[error("a unique id path needs 16 hex pairs (got {0})")]
    InvalidSegmentCount(usize),

    #[error("the pair '{0}' is not a valid hexadecimal pair")]
    InvalidHexPair(String),

    #[error("invalid table name: {0}")]
    InvalidTableName(String),

    #[error("'{0}' cannot be used as a directory name")]
    InvalidPathComponent(String),

    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("catalog query failed: {0}")]
    QueryFailed(String),

    #[error("archive for model {uid} is missing or unreadable: {path}")]
    SourceArchiveMissing { uid: String, path: String },

    #[error("failed to read archive {path}: {message}")]
    SourceReadFailed { path: String, message: String },

    #[error("failed to write {path}: {message}")]
    OutputWriteFailed { path: String, message: String },

    #[error("config file not found: {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

impl From<rusqlite::Error> for M4dbError {
    fn from(err: rusqlite::Error) -> Self {
        M4dbError::QueryFailed(err.to_string())
    }
}
