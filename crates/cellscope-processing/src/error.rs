//! Error types for dataset loading and cleaning.
//!
//! Every failure that means "the file does not have the shape we expect" is a
//! schema error and reports the `SCHEMA_ERROR` code, whatever the variant.
//! Errors are serializable so a presentation layer can show them verbatim.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for data preparation.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// One or more expected columns are absent from the source.
    #[error("Missing expected column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The diagnosis column holds a value other than `M` or `B`.
    #[error("Invalid diagnosis label {value:?} at row {row} (expected \"M\" or \"B\")")]
    InvalidLabel { row: usize, value: String },

    /// A feature column could not be read as numbers.
    #[error("Feature column '{column}' is not numeric: {reason}")]
    NonNumericColumn { column: String, reason: String },

    /// A feature cell is empty.
    #[error("Feature column '{column}' has a missing value at row {row}")]
    MissingValue { column: String, row: usize },

    /// A feature cell parsed as NaN or infinity.
    #[error("Feature column '{column}' has a non-finite value at row {row}")]
    NonFiniteValue { column: String, row: usize },

    /// A feature cell is below zero; every measurement is a size or a ratio.
    #[error("Feature column '{column}' has a negative value {value} at row {row}")]
    NegativeValue {
        column: String,
        row: usize,
        value: f64,
    },

    /// The source has a header but no rows.
    #[error("Dataset contains no rows")]
    EmptyDataset,

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingColumns(_)
            | Self::InvalidLabel { .. }
            | Self::NonNumericColumn { .. }
            | Self::MissingValue { .. }
            | Self::NonFiniteValue { .. }
            | Self::NegativeValue { .. }
            | Self::EmptyDataset => "SCHEMA_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if the source itself is malformed (as opposed to unreadable).
    pub fn is_schema_error(&self) -> bool {
        self.error_code() == "SCHEMA_ERROR"
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for data preparation.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}
