//! Error types for qcdstack

use thiserror::Error;

/// qcdstack error type
#[derive(Error, Debug)]
pub enum Error {
    /// Variable has no entry in the binning registry.
    #[error("unknown variable: '{0}'")]
    UnknownVariable(String),

    /// Histogram requested from a store that does not hold it.
    #[error("missing histogram: '{0}'")]
    MissingKey(String),

    /// Bin-count disagreement between histograms that are combined.
    #[error("shape mismatch in {context}: expected {expected} bins, found {found}")]
    ShapeMismatch {
        /// What was being computed (key or operation).
        context: String,
        /// Bin count of the reference histogram.
        expected: usize,
        /// Bin count of the offending histogram.
        found: usize,
    },

    /// The event source backing a process cannot be opened or read.
    #[error("event source unavailable for process '{process}': {reason}")]
    SourceUnavailable {
        /// Process label.
        process: String,
        /// Underlying failure.
        reason: String,
    },

    /// Selection, variable or weight expression failed to compile or evaluate.
    #[error("expression error: {0}")]
    Expression(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl Error {
    /// Shorthand for a [`Error::ShapeMismatch`].
    pub fn shape(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Error::ShapeMismatch { context: context.into(), expected, found }
    }

    /// `true` for the only error class the pipeline recovers from.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Error::SourceUnavailable { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
