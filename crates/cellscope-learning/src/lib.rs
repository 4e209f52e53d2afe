//! cellscope-learning: training, artifact storage and inference for the
//! cell-nuclei diagnosis classifier.
//!
//! This crate fits a feature scaler and an L2-regularized logistic regression
//! on a [`CleanedDataset`](cellscope_processing::CleanedDataset), evaluates
//! them on a seeded held-out partition, persists both as named artifacts, and
//! serves predictions from those artifacts.
//!
//! # Features
//!
//! - **Reproducible Training**: Seeded split, deterministic gradient descent
//! - **No Leakage**: The scaler only ever sees the train partition
//! - **Versioned Artifacts**: `scaler` and `model` files tied to one fit by their header
//! - **Validated Inference**: Requests are checked before they reach the model
//! - **Progress Reporting**: Stage callbacks while a pipeline runs
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cellscope_learning::{ArtifactStore, PredictionRequest, Predictor, TestSize};
//! use cellscope_processing::load_and_clean;
//!
//! let (dataset, _) = load_and_clean("data/data.csv")?;
//!
//! // Fit with 80 held-out rows and seed 1, then persist
//! let outcome = cellscope_learning::fit(&dataset, TestSize::Count(80), 1)?;
//! let store = ArtifactStore::new("model/");
//! store.save_pair(&outcome.scaler, &outcome.model)?;
//! println!("{}", outcome.report);
//!
//! // Later, possibly in another process
//! let predictor = Predictor::load("model/")?;
//! let request = PredictionRequest::from_values(dataset.row(0).unwrap())?;
//! let result = predictor.predict(&request);
//! println!("{} ({:.3})", result.diagnosis, result.probability_malignant);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Training                                │
//! │                                                                  │
//! │  CleanedDataset ──► split ──► ScalerParams::fit(train)           │
//! │                                   │                              │
//! │                                   ▼                              │
//! │                     LogisticRegression::fit ──► EvaluationReport │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ ArtifactStore (scaler.bin, model.bin)
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Inference                               │
//! │                                                                  │
//! │  PredictionRequest ──► scaler ──► model ──► PredictionResult     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`](Result). The
//! variants a prediction caller usually distinguishes:
//!
//! - [`LearningError::Validation`] - The request itself is malformed
//! - [`LearningError::ArtifactMissing`] - An artifact is absent or undecodable
//! - [`LearningError::ArtifactSchema`] - An artifact describes other features
//!
//! Each variant maps to a stable code via [`LearningError::error_code()`].
//!
//! # Thread Safety
//!
//! [`Predictor`] is immutable and `Send + Sync`; share it behind an `Arc`.
//! [`SharedPredictor`] additionally allows swapping in retrained artifacts
//! while other threads are predicting.

pub mod artifacts;
pub mod classifier;
mod config;
mod error;
pub mod metrics;
mod model;
mod pipeline;
mod progress;
pub mod scaler;
pub mod split;
mod types;

// Re-export public API
//
// Configuration types
pub use config::{
    LogisticConfig, ParseScalerKindError, ScalerKind, TestSize, TrainingConfig,
    TrainingConfigBuilder,
};
// Error types
pub use error::{LearningError, Result, ResultExt, ValidationError};
// Artifact storage
pub use artifacts::{Artifact, ArtifactHeader, ArtifactStore, MODEL_ARTIFACT, SCALER_ARTIFACT};
// Fitted parameters
pub use classifier::{DECISION_THRESHOLD, LogisticRegression, ModelParams};
pub use scaler::ScalerParams;
// Evaluation
pub use metrics::{ClassMetrics, ConfusionMatrix, EvaluationReport};
// Inference
pub use model::{Predictor, SharedPredictor};
// Pipeline types
pub use pipeline::{TrainingPipeline, TrainingPipelineBuilder};
// Progress reporting types
pub use progress::{ProgressCallback, ProgressUpdate, TrainingStage};
// Request and result types
pub use types::{PredictionRequest, PredictionResult, TrainingOutcome};

use cellscope_processing::CleanedDataset;

/// Fit the scaler and classifier with default hyperparameters.
///
/// `test_size` and `seed` control the held-out partition; everything else
/// uses [`TrainingConfig::default()`]. Nothing is written to disk; persist
/// the outcome with an [`ArtifactStore`] or use [`TrainingPipeline::run`].
///
/// # Errors
///
/// Returns [`LearningError::Data`] if the dataset holds fewer than two classes
/// or `test_size` leaves no rows on either side of the split.
pub fn fit(dataset: &CleanedDataset, test_size: TestSize, seed: u64) -> Result<TrainingOutcome> {
    let config = TrainingConfig::builder()
        .test_size(test_size)
        .random_seed(seed)
        .build()?;
    TrainingPipeline::builder().config(config).build()?.fit(dataset)
}

/// Load the artifacts in `dir` and classify one JSON request.
///
/// Convenient for one-off calls; long-lived callers should load a
/// [`Predictor`] once and reuse it.
pub fn predict(dir: impl AsRef<std::path::Path>, request: &serde_json::Value) -> Result<PredictionResult> {
    Predictor::load(dir)?.predict_json(request)
}
