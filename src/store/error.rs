use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error reading history file '{0}'")]
    ReadIo(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode history file '{0}'")]
    ReadPolars(PathBuf, #[source] PolarsError),

    #[error("I/O error writing history file '{0}'")]
    WriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing history file '{0}'")]
    WritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed building history frame: {0}")]
    Frame(#[from] PolarsError),

    #[error("Row {row} of history file has no {column}")]
    MissingValue { row: usize, column: &'static str },

    #[error("Row {row} has an invalid timestamp {millis}")]
    InvalidTimestamp { row: usize, millis: i64 },
}
