//! Error types for the cellscope-learning crate.
//!
//! This module defines [`LearningError`], the main error type used throughout
//! the crate, and [`ValidationError`], the reasons a single prediction request
//! can be rejected.
//!
//! Every variant maps to a stable code via [`LearningError::error_code`], and
//! errors serialize as `{ "code": ..., "message": ... }` so a presentation
//! layer can show them without matching on variants.
//!
//! # Example
//!
//! ```no_run
//! use cellscope_learning::{LearningError, Predictor};
//!
//! fn open() -> Result<Predictor, LearningError> {
//!     // Errors are propagated with ?
//!     let predictor = Predictor::load("model/")?;
//!     Ok(predictor)
//! }
//! ```

use cellscope_processing::ProcessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Why a prediction request was rejected.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValidationError {
    /// The request does not have exactly one value per feature.
    #[error("expected {expected} feature values, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// Features absent from a keyed request.
    #[error("missing feature(s): {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    /// Keys that are not part of the feature schema.
    #[error("unknown feature(s): {}", .0.join(", "))]
    UnknownFeatures(Vec<String>),

    /// A value that is not a JSON number.
    #[error("feature '{feature}' is not numeric (got {value})")]
    NonNumeric { feature: String, value: String },

    /// NaN or infinite.
    #[error("feature '{feature}' is not finite")]
    NonFinite { feature: String },

    /// Measurements are sizes and ratios; none can be negative.
    #[error("feature '{feature}' is negative ({value})")]
    Negative { feature: String, value: f64 },

    /// The request body does not parse as JSON.
    #[error("request is not valid JSON: {0}")]
    InvalidJson(String),

    /// The request body is not a JSON object.
    #[error("request must be a JSON object mapping feature names to numbers")]
    NotAnObject,
}

/// The main error type for training and inference.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid training configuration.
    ///
    /// Check the error message for which value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The dataset cannot be trained on as requested.
    ///
    /// Raised when fewer than two classes are present or when the test
    /// partition would be empty or leave no training rows.
    #[error("Invalid data: {0}")]
    Data(String),

    /// Loading or cleaning the dataset failed.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Gradient descent produced unusable parameters.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// An artifact is absent or cannot be decoded.
    #[error("Artifact '{name}' is missing or unreadable: {reason}")]
    ArtifactMissing { name: String, reason: String },

    /// An artifact decoded, but does not describe the thirty-feature schema.
    #[error("Artifact '{name}' does not match the feature schema: {reason}")]
    ArtifactSchema { name: String, reason: String },

    /// A prediction request was rejected.
    #[error("Invalid prediction request: {0}")]
    Validation(#[from] ValidationError),

    /// I/O error during artifact or request file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LearningError>,
    },
}

impl LearningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LearningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn artifact_missing(name: &str, reason: impl Into<String>) -> Self {
        LearningError::ArtifactMissing {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn artifact_schema(name: &str, reason: impl Into<String>) -> Self {
        LearningError::ArtifactSchema {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Data(_) => "DATA_ERROR",
            Self::Processing(e) => e.error_code(),
            Self::TrainingFailed(_) => "TRAINING_FAILED",
            Self::ArtifactMissing { .. } => "ARTIFACT_MISSING",
            Self::ArtifactSchema { .. } => "ARTIFACT_SCHEMA",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether only the current request failed; the predictor stays usable.
    pub fn is_request_error(&self) -> bool {
        self.error_code() == "VALIDATION_ERROR"
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for training and inference.
pub type Result<T> = std::result::Result<T, LearningError>;

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

impl<T> ResultExt<T> for std::result::Result<T, ProcessingError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| LearningError::Processing(e).with_context(context))
    }
}
