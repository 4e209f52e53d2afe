//! Configuration types for the training pipeline.
//!
//! This module provides [`TrainingConfig`] and its builder, as well as the
//! [`TestSize`], [`ScalerKind`] and [`LogisticConfig`] values it is made of.
//!
//! # Example
//!
//! ```
//! use cellscope_learning::{ScalerKind, TestSize, TrainingConfig};
//!
//! let config = TrainingConfig::builder()
//!     .test_size(TestSize::Count(80))
//!     .random_seed(1)
//!     .scaler(ScalerKind::Standard)
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::{LearningError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How many rows are held out for evaluation.
///
/// Both forms resolve to a row count `k` with `1 <= k <= n - 1`, so neither
/// partition is ever empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSize {
    /// Share of the dataset, strictly between 0 and 1. Rounded up.
    Fraction(f64),
    /// Absolute number of rows.
    Count(usize),
}

impl Default for TestSize {
    fn default() -> Self {
        TestSize::Fraction(0.2)
    }
}

impl TestSize {
    /// Resolve to a test-partition row count for a dataset of `n_samples`.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Data`] if the resulting test partition would
    /// be empty or would leave no rows to train on.
    pub fn resolve(&self, n_samples: usize) -> Result<usize> {
        let count = match *self {
            TestSize::Fraction(f) => {
                if !(f > 0.0 && f < 1.0) {
                    return Err(LearningError::Data(format!(
                        "test fraction must be between 0 and 1 (exclusive), got {f}"
                    )));
                }
                (f * n_samples as f64).ceil() as usize
            }
            TestSize::Count(k) => k,
        };

        if count == 0 {
            return Err(LearningError::Data(
                "test partition would be empty".to_string(),
            ));
        }
        if count >= n_samples {
            return Err(LearningError::Data(format!(
                "test partition of {count} rows leaves no training rows out of {n_samples}"
            )));
        }
        Ok(count)
    }
}

/// Per-feature scaling applied before the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ScalerKind {
    /// Subtract the mean, divide by the population standard deviation.
    #[default]
    Standard,
    /// Subtract the minimum, divide by the range.
    MinMax,
}

impl ScalerKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalerKind::Standard => "standard",
            ScalerKind::MinMax => "minmax",
        }
    }
}

/// Error type for parsing a [`ScalerKind`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseScalerKindError {
    invalid_value: String,
}

impl ParseScalerKindError {
    /// Returns the invalid value that caused the parse error.
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl std::fmt::Display for ParseScalerKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid scaler: '{}'. Valid values are: standard, minmax",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseScalerKindError {}

impl FromStr for ScalerKind {
    type Err = ParseScalerKindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(ScalerKind::Standard),
            "minmax" | "min_max" => Ok(ScalerKind::MinMax),
            _ => Err(ParseScalerKindError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// Hyperparameters of the L2-regularized logistic regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse regularization strength (default: 1.0). Smaller is stronger.
    pub c: f64,

    /// Gradient descent step size (default: 0.1).
    pub learning_rate: f64,

    /// Iteration cap (default: 1000).
    pub max_iter: usize,

    /// Stop once the gradient norm falls below this (default: 1e-6).
    pub tolerance: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            learning_rate: 0.1,
            max_iter: 1000,
            tolerance: 1e-6,
        }
    }
}

/// Configuration for the training pipeline.
///
/// Use [`TrainingConfig::builder()`] to construct a validated configuration.
///
/// # Validation
///
/// The builder validates the following constraints on [`build()`](TrainingConfigBuilder::build):
/// - a fractional `test_size` must be in range `(0.0, 1.0)` (exclusive)
/// - a counted `test_size` must be at least 1
/// - `c` and `learning_rate` must be finite and positive
/// - `max_iter` must be at least 1
/// - `tolerance` must be finite and non-negative
///
/// Whether the test size fits a particular dataset is only known at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Held-out evaluation rows (default: 20%).
    pub test_size: TestSize,

    /// Seed for the train/test shuffle (default: 1).
    pub random_seed: u64,

    /// Feature scaling (default: standard).
    pub scaler: ScalerKind,

    /// Classifier hyperparameters.
    pub logistic: LogisticConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: TestSize::default(),
            random_seed: 1,
            scaler: ScalerKind::default(),
            logistic: LogisticConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new builder for `TrainingConfig`.
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }
}

/// Builder for [`TrainingConfig`].
///
/// Created via [`TrainingConfig::builder()`]. All setters return `self` to allow
/// method chaining.
#[derive(Debug, Clone, Default)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    #[must_use]
    pub fn test_size(mut self, size: TestSize) -> Self {
        self.config.test_size = size;
        self
    }

    /// Hold out a share of the rows.
    #[must_use]
    pub fn test_fraction(self, fraction: f64) -> Self {
        self.test_size(TestSize::Fraction(fraction))
    }

    /// Hold out an exact number of rows.
    #[must_use]
    pub fn test_count(self, count: usize) -> Self {
        self.test_size(TestSize::Count(count))
    }

    /// Set the random seed for the split (default: 1).
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    #[must_use]
    pub fn scaler(mut self, kind: ScalerKind) -> Self {
        self.config.scaler = kind;
        self
    }

    /// Replace all classifier hyperparameters at once.
    #[must_use]
    pub fn logistic(mut self, logistic: LogisticConfig) -> Self {
        self.config.logistic = logistic;
        self
    }

    /// Set the inverse regularization strength (default: 1.0).
    #[must_use]
    pub fn c(mut self, c: f64) -> Self {
        self.config.logistic.c = c;
        self
    }

    #[must_use]
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.config.logistic.learning_rate = rate;
        self
    }

    #[must_use]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.logistic.max_iter = max_iter;
        self
    }

    #[must_use]
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.logistic.tolerance = tolerance;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if any value is out of range.
    pub fn build(self) -> Result<TrainingConfig> {
        match self.config.test_size {
            TestSize::Fraction(f) if !(f > 0.0 && f < 1.0) => {
                return Err(LearningError::InvalidConfig(
                    "test_size fraction must be between 0.0 and 1.0 (exclusive)".to_string(),
                ));
            }
            TestSize::Count(0) => {
                return Err(LearningError::InvalidConfig(
                    "test_size count must be at least 1".to_string(),
                ));
            }
            _ => {}
        }

        let logistic = &self.config.logistic;

        if !(logistic.c.is_finite() && logistic.c > 0.0) {
            return Err(LearningError::InvalidConfig(
                "c must be a positive number".to_string(),
            ));
        }

        if !(logistic.learning_rate.is_finite() && logistic.learning_rate > 0.0) {
            return Err(LearningError::InvalidConfig(
                "learning_rate must be a positive number".to_string(),
            ));
        }

        if logistic.max_iter == 0 {
            return Err(LearningError::InvalidConfig(
                "max_iter must be at least 1".to_string(),
            ));
        }

        if !(logistic.tolerance.is_finite() && logistic.tolerance >= 0.0) {
            return Err(LearningError::InvalidConfig(
                "tolerance must be a non-negative number".to_string(),
            ));
        }

        Ok(self.config)
    }
}
