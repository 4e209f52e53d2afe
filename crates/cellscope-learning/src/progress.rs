//! Progress reporting types for the training pipeline.
//!
//! This module defines [`TrainingStage`], [`ProgressUpdate`], and the
//! [`ProgressCallback`] type alias.
//!
//! # Example
//!
//! ```
//! use cellscope_learning::{ProgressUpdate, TrainingConfig, TrainingPipeline};
//!
//! let pipeline = TrainingPipeline::builder()
//!     .config(TrainingConfig::default())
//!     .on_progress(|update: ProgressUpdate| {
//!         println!(
//!             "[{}] {:.0}% - {}",
//!             update.stage.as_str(),
//!             update.progress * 100.0,
//!             update.message
//!         );
//!     })
//!     .build();
//! ```

use std::sync::Arc;

/// The current stage of the training pipeline.
///
/// Training progresses through these stages in order:
///
/// 1. [`Initializing`](Self::Initializing) - Validating the dataset
/// 2. [`Splitting`](Self::Splitting) - Seeded train/test split
/// 3. [`Scaling`](Self::Scaling) - Fitting the scaler on the train partition
/// 4. [`Training`](Self::Training) - Gradient descent
/// 5. [`Evaluation`](Self::Evaluation) - Metrics on the test partition
/// 6. [`Persisting`](Self::Persisting) - Writing artifacts (only when running, not fitting)
/// 7. [`Complete`](Self::Complete)
///
/// Terminal states: [`Complete`](Self::Complete), [`Failed`](Self::Failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TrainingStage {
    #[default]
    Initializing,
    Splitting,
    Scaling,
    Training,
    Evaluation,
    Persisting,
    Complete,
    Failed,
}

impl TrainingStage {
    /// Returns the stage name used in logs and JSON output.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellscope_learning::TrainingStage;
    ///
    /// assert_eq!(TrainingStage::Scaling.as_str(), "scaling");
    /// ```
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStage::Initializing => "initializing",
            TrainingStage::Splitting => "splitting",
            TrainingStage::Scaling => "scaling",
            TrainingStage::Training => "training",
            TrainingStage::Evaluation => "evaluation",
            TrainingStage::Persisting => "persisting",
            TrainingStage::Complete => "complete",
            TrainingStage::Failed => "failed",
        }
    }

    /// Returns `true` if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainingStage::Complete | TrainingStage::Failed)
    }
}

/// A progress update from the training pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressUpdate {
    /// The current training stage.
    pub stage: TrainingStage,

    /// Overall progress from 0.0 to 1.0, non-decreasing during a run.
    pub progress: f64,

    /// Human-readable status message.
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: TrainingStage, progress: f64, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress,
            message: message.into(),
        }
    }
}

/// Type alias for a progress callback function.
///
/// The callback should execute quickly; it runs inline on the training thread.
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;
