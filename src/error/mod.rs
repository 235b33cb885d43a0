//! Error handling for the ADU/ACS pipeline.

pub mod util;

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

use crate::schema::adapt::AdapterError;
use crate::schema::SchemaParityReport;

/// Specialized error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Error opening, reading or writing a file
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error processing Arrow data (CSV decoding, IPC, kernels)
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Remote service could not be reached or answered with an error status
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed JSON payload or configuration file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Column type adaptation failed
    #[error("Adaptation error: {0}")]
    Adapter(#[from] AdapterError),

    /// A configured column is absent from the table
    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    /// A column has a type the operation cannot work with
    #[error("Column '{column}' has unexpected type, expected {expected}")]
    InvalidDataType { column: String, expected: String },

    /// A geographic code does not have the width required for truncation
    #[error("Invalid tract key at row {row}: '{value}' has {width} characters, expected {expected}")]
    InvalidTractKey {
        row: usize,
        value: String,
        width: usize,
        expected: usize,
    },

    /// The permit sources disagree on their column layout
    #[error("Permit sources have mismatching schemas: {0}")]
    SchemaMismatch(SchemaParityReport),

    /// Malformed geometry encoding
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// The census services answered with an unexpected payload
    #[error("Census response error: {0}")]
    Census(String),

    /// Invalid pipeline configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Attach a path to an IO error
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a missing column
    pub fn column_not_found(column: &str) -> Self {
        Self::ColumnNotFound {
            column: column.to_string(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
