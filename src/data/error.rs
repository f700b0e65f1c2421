use std::path::PathBuf;

use thiserror::Error;

use super::model::SiteId;

/// Errors raised while locating, loading or aggregating experiment data.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Data directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("No file matching '{keyword}' in the data directory")]
    Unavailable { keyword: String },

    #[error("Unsupported file extension: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("{source_name}: missing column '{column}'")]
    MissingColumn { source_name: String, column: String },

    #[error("{source_name}, row {row}: {reason}")]
    MalformedRow {
        source_name: String,
        row: usize,
        reason: String,
    },

    #[error("{source_name}, row {row}: '{value}' is not a timestamp")]
    MalformedTimestamp {
        source_name: String,
        row: usize,
        value: String,
    },

    #[error("Site '{site}' is provided by more than one file ({})", .path.display())]
    DuplicateSite { site: SiteId, path: PathBuf },

    #[error("Unknown site: {0}")]
    UnknownSite(SiteId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type Result<T> = std::result::Result<T, DataError>;
