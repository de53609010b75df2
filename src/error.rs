use std::{io, path::PathBuf};

use reqwest::StatusCode;
use thiserror::Error;

/// Failure to retrieve the remote file.  Always fatal, nothing touches the
/// database after one of these.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("failed to write {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("column {0} is not in the csv header")]
    MissingColumn(String),
    #[error("failed parsing {value:?} in column {column} as a timestamp")]
    Timestamp { column: String, value: String },
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("batch does not match the table schema: {0}")]
    SchemaMismatch(String),
    #[error("value {value:?} in column {column} is not a valid {expected}")]
    TypeMismatch {
        column: String,
        value: String,
        expected: &'static str,
    },
    #[error(transparent)]
    Database(#[from] duckdb::Error),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("malformed csv: {0}")]
    Read(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("source file has no data rows")]
    EmptySource,
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
}
