//! Error types for the event-processing engine.

use thiserror::Error;

/// Errors raised while loading event tables or filling histograms.
#[derive(Error, Debug)]
pub enum FrameError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parquet decoding/encoding failure.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow conversion failure.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Expression parse error.
    #[error("expression error: {0}")]
    Expression(String),

    /// Column referenced by an expression is not present in the table.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Column with a type that cannot be read as `f64`.
    #[error("unsupported column type for '{column}': {data_type}")]
    UnsupportedColumn {
        /// Column name.
        column: String,
        /// Arrow data type, formatted.
        data_type: String,
    },

    /// Columns of one table disagree on the number of rows.
    #[error("column '{column}' has {found} rows, table has {expected}")]
    LengthMismatch {
        /// Column name.
        column: String,
        /// Rows in the table.
        expected: usize,
        /// Rows in the offending column.
        found: usize,
    },

    /// No event source registered under this name.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// Histogram filling error (invalid axis, bad handle).
    #[error("histogram fill error: {0}")]
    HistogramFill(String),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, FrameError>;
