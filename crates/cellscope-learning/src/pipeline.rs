//! Training pipeline implementation.
//!
//! This module provides the [`TrainingPipeline`] struct and its builder. The
//! pipeline executes these stages in order:
//!
//! 1. **Splitting** - Seeded, disjoint train/test partitions
//! 2. **Scaling** - Fit the scaler on the train partition only, transform both
//! 3. **Training** - Logistic regression on the scaled train partition
//! 4. **Evaluation** - Accuracy and per-class report on the scaled test partition
//! 5. **Persisting** - Write the `scaler` and `model` artifacts ([`run`](TrainingPipeline::run) only)
//!
//! # Example
//!
//! ```rust,ignore
//! use cellscope_learning::{ArtifactStore, TrainingConfig, TrainingPipeline};
//! use cellscope_processing::load_and_clean;
//!
//! let (dataset, _) = load_and_clean("data/data.csv")?;
//!
//! let pipeline = TrainingPipeline::builder()
//!     .config(TrainingConfig::builder().test_count(80).build()?)
//!     .on_progress(|u| println!("[{}] {:.0}% - {}", u.stage.as_str(), u.progress * 100.0, u.message))
//!     .build()?;
//!
//! let outcome = pipeline.run(&dataset, &ArtifactStore::new("model/"))?;
//! println!("Accuracy: {:.3}", outcome.report.accuracy);
//! ```

use crate::artifacts::ArtifactStore;
use crate::classifier::{LogisticRegression, accuracy_on, targets};
use crate::config::TrainingConfig;
use crate::error::{LearningError, Result};
use crate::metrics::EvaluationReport;
use crate::progress::{ProgressCallback, ProgressUpdate, TrainingStage};
use crate::scaler::ScalerParams;
use crate::split::train_test_split;
use crate::types::TrainingOutcome;
use cellscope_processing::CleanedDataset;
use std::time::Instant;
use tracing::{error, info};

/// The training pipeline.
///
/// Use [`TrainingPipeline::builder()`] to construct one. A pipeline holds no
/// state between runs, so the same instance can fit many datasets.
pub struct TrainingPipeline {
    config: TrainingConfig,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for TrainingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingPipeline")
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl TrainingPipeline {
    /// Create a new builder for `TrainingPipeline`.
    #[must_use]
    pub fn builder() -> TrainingPipelineBuilder {
        TrainingPipelineBuilder::default()
    }

    /// Get the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit the scaler and classifier in memory and evaluate them.
    ///
    /// Nothing is written to disk.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Data`] if the dataset holds fewer than two
    /// classes or the configured test size does not fit it, and
    /// [`LearningError::TrainingFailed`] if gradient descent diverges.
    pub fn fit(&self, dataset: &CleanedDataset) -> Result<TrainingOutcome> {
        let outcome = self.fit_stages(dataset);
        match outcome {
            Ok(outcome) => {
                self.report(TrainingStage::Complete, 1.0, "Training complete");
                Ok(outcome)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Fit, then persist the `scaler` and `model` artifacts to `store`.
    ///
    /// Artifacts are only written after the fit succeeded, so a failed run
    /// leaves any previous artifacts untouched.
    pub fn run(&self, dataset: &CleanedDataset, store: &ArtifactStore) -> Result<TrainingOutcome> {
        let outcome = match self.fit_stages(dataset) {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e)),
        };

        self.report(
            TrainingStage::Persisting,
            0.9,
            format!("Writing artifacts to {}", store.dir().display()),
        );
        if let Err(e) = store.save_pair(&outcome.scaler, &outcome.model) {
            return Err(self.fail(e));
        }

        self.report(TrainingStage::Complete, 1.0, "Training complete");
        Ok(outcome)
    }

    fn fit_stages(&self, dataset: &CleanedDataset) -> Result<TrainingOutcome> {
        let start = Instant::now();
        let config = &self.config;

        self.report(
            TrainingStage::Initializing,
            0.0,
            format!("Validating dataset of {} rows", dataset.n_samples()),
        );
        if dataset.n_classes() < 2 {
            let (benign, malignant) = dataset.class_counts();
            return Err(LearningError::Data(format!(
                "both classes are required to train, found {benign} benign and {malignant} malignant rows"
            )));
        }

        self.report(TrainingStage::Splitting, 0.1, "Splitting train/test partitions");
        let split = train_test_split(dataset.n_samples(), config.test_size, config.random_seed)?;
        let train = subset(dataset, &split.train)?;
        let test = subset(dataset, &split.test)?;
        info!(
            "Split {} rows into {} train / {} test (seed {})",
            dataset.n_samples(),
            train.n_samples(),
            test.n_samples(),
            config.random_seed
        );

        self.report(
            TrainingStage::Scaling,
            0.25,
            format!("Fitting {} scaler on the train partition", config.scaler.as_str()),
        );
        let scaler = ScalerParams::fit(config.scaler, train.rows())?;
        let x_train = scaler.transform(train.rows());
        let x_test = scaler.transform(test.rows());

        self.report(TrainingStage::Training, 0.4, "Fitting logistic regression");
        let model = LogisticRegression::new(config.logistic).fit(&x_train, &targets(train.labels()))?;

        self.report(TrainingStage::Evaluation, 0.8, "Evaluating on the test partition");
        let train_accuracy = accuracy_on(&model, &x_train, train.labels());
        let predicted = model.predict_batch(&x_test);
        let report = EvaluationReport::from_predictions(
            test.labels(),
            &predicted,
            train_accuracy,
            train.n_samples(),
        );
        info!(
            "Test accuracy {:.4} (train {:.4})",
            report.accuracy, report.train_accuracy
        );

        Ok(TrainingOutcome {
            scaler,
            model,
            report,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn report(&self, stage: TrainingStage, progress: f64, message: impl Into<String>) {
        if let Some(ref callback) = self.progress_callback {
            callback(ProgressUpdate::new(stage, progress, message));
        }
    }

    fn fail(&self, e: LearningError) -> LearningError {
        error!("Training failed: {}", e);
        self.report(TrainingStage::Failed, 1.0, e.to_string());
        e
    }
}

fn subset(dataset: &CleanedDataset, indices: &[usize]) -> Result<CleanedDataset> {
    dataset
        .subset(indices)
        .ok_or_else(|| LearningError::Data("split index out of range".to_string()))
}

/// Builder for [`TrainingPipeline`].
///
/// # Required Configuration
///
/// - [`config()`](Self::config): Training configuration
///
/// # Optional Configuration
///
/// - [`on_progress()`](Self::on_progress): Progress callback for monitoring
#[derive(Default)]
pub struct TrainingPipelineBuilder {
    config: Option<TrainingConfig>,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for TrainingPipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingPipelineBuilder")
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl TrainingPipelineBuilder {
    /// Set the training configuration (required).
    #[must_use]
    pub fn config(mut self, config: TrainingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the progress callback (optional).
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(std::sync::Arc::new(callback));
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if no configuration was provided.
    pub fn build(self) -> Result<TrainingPipeline> {
        let config = self.config.ok_or_else(|| {
            LearningError::InvalidConfig("Training config is required".to_string())
        })?;

        Ok(TrainingPipeline {
            config,
            progress_callback: self.progress_callback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestSize;
    use cellscope_processing::{Diagnosis, FEATURE_COUNT, FeatureRow};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    /// Benign rows cluster low, malignant rows high; feature 7 is constant.
    fn dataset(n_per_class: usize) -> CleanedDataset {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n_per_class {
            for (offset, label) in [(1.0, Diagnosis::Benign), (5.0, Diagnosis::Malignant)] {
                let mut row: FeatureRow = [0.0; FEATURE_COUNT];
                for (j, value) in row.iter_mut().enumerate() {
                    *value = offset + ((i * 7 + j * 3) % 10) as f64 / 10.0;
                }
                row[7] = 2.0;
                rows.push(row);
                labels.push(label);
            }
        }
        CleanedDataset::new(rows, labels).unwrap()
    }

    fn pipeline(test_size: TestSize) -> TrainingPipeline {
        TrainingPipeline::builder()
            .config(TrainingConfig::builder().test_size(test_size).build().unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_pipeline_builder_requires_config() {
        let err = TrainingPipeline::builder().build().unwrap_err();
        assert!(matches!(err, LearningError::InvalidConfig(_)));
        assert!(err.to_string().contains("config is required"));
    }

    #[test]
    fn test_pipeline_builder_debug() {
        let builder = TrainingPipeline::builder()
            .config(TrainingConfig::default())
            .on_progress(|_| {});
        let debug_str = format!("{:?}", builder);
        assert!(debug_str.contains("TrainingPipelineBuilder"));
        assert!(debug_str.contains("<callback>"));
    }

    #[test]
    fn test_fit_separable_data() {
        let outcome = pipeline(TestSize::Fraction(0.25)).fit(&dataset(20)).unwrap();

        assert_eq!(outcome.report.n_test, 10);
        assert_eq!(outcome.report.n_train, 30);
        assert_eq!(outcome.report.accuracy, 1.0);
        assert_eq!(outcome.report.train_accuracy, 1.0);
        assert_eq!(outcome.scaler.degenerate_features(), vec![7]);
        assert_eq!(outcome.model.coefficients[7], 0.0);
    }

    #[test]
    fn test_same_seed_same_parameters() {
        let ds = dataset(15);
        let a = pipeline(TestSize::Count(6)).fit(&ds).unwrap();
        let b = pipeline(TestSize::Count(6)).fit(&ds).unwrap();
        assert_eq!(a.scaler, b.scaler);
        assert_eq!(a.model, b.model);
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn test_single_class_is_data_error() {
        let rows = vec![[1.0; FEATURE_COUNT]; 4];
        let ds = CleanedDataset::new(rows, vec![Diagnosis::Benign; 4]).unwrap();
        let err = pipeline(TestSize::Count(1)).fit(&ds).unwrap_err();
        assert_eq!(err.error_code(), "DATA_ERROR");
    }

    #[test]
    fn test_oversized_test_is_data_error() {
        let err = pipeline(TestSize::Count(40)).fit(&dataset(20)).unwrap_err();
        assert_eq!(err.error_code(), "DATA_ERROR");
    }

    #[test]
    fn test_progress_stages_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();
        let progress = Arc::new(Mutex::new(Vec::new()));
        let progress_sink = progress.clone();

        let pipeline = TrainingPipeline::builder()
            .config(TrainingConfig::default())
            .on_progress(move |update| {
                sink.lock().unwrap().push(update.stage);
                progress_sink.lock().unwrap().push(update.progress);
            })
            .build()
            .unwrap();

        let dir = tempdir().unwrap();
        pipeline
            .run(&dataset(10), &ArtifactStore::new(dir.path()))
            .unwrap();

        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                TrainingStage::Initializing,
                TrainingStage::Splitting,
                TrainingStage::Scaling,
                TrainingStage::Training,
                TrainingStage::Evaluation,
                TrainingStage::Persisting,
                TrainingStage::Complete,
            ]
        );
        let progress = progress.lock().unwrap();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_failure_reports_failed_stage() {
        let last = Arc::new(Mutex::new(None));
        let sink = last.clone();
        let pipeline = TrainingPipeline::builder()
            .config(TrainingConfig::builder().test_count(100).build().unwrap())
            .on_progress(move |update| *sink.lock().unwrap() = Some(update.stage))
            .build()
            .unwrap();

        assert!(pipeline.fit(&dataset(5)).is_err());
        assert_eq!(*last.lock().unwrap(), Some(TrainingStage::Failed));
    }

    #[test]
    fn test_run_writes_artifacts() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let outcome = pipeline(TestSize::Count(4)).run(&dataset(10), &store).unwrap();

        let scaler: ScalerParams = store.load().unwrap();
        assert_eq!(scaler, outcome.scaler);
        assert!(store.exists("model"));
    }

    #[test]
    fn test_failed_run_keeps_previous_artifacts() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let first = pipeline(TestSize::Count(4)).run(&dataset(10), &store).unwrap();

        let err = pipeline(TestSize::Count(500))
            .run(&dataset(10), &store)
            .unwrap_err();
        assert_eq!(err.error_code(), "DATA_ERROR");

        let scaler: ScalerParams = store.load().unwrap();
        assert_eq!(scaler, first.scaler);
    }
}
