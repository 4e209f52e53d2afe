//! L2-regularized logistic regression fitted by full-batch gradient descent.
//!
//! The objective is scikit-learn's, divided by `C * n`:
//!
//! ```text
//! mean(log_loss) + ||w||^2 / (2 * C * n)
//! ```
//!
//! The intercept is not penalized. Weights start at zero and there is no
//! randomness, so the same scaled training matrix always yields the same
//! parameters.

use crate::config::LogisticConfig;
use crate::error::{LearningError, Result};
use cellscope_processing::{Diagnosis, FEATURE_COUNT, feature_names};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Decision threshold on the malignant probability.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Numerically stable logistic function.
#[inline]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Fitted classifier parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub feature_names: Vec<String>,
    pub hyperparameters: LogisticConfig,
    /// Gradient steps actually taken.
    pub n_iter: usize,
    /// Whether the gradient norm fell below the tolerance.
    pub converged: bool,
}

impl ModelParams {
    /// Linear score `w . x + b` of a scaled row.
    pub fn decision_function(&self, scaled: &[f64]) -> f64 {
        self.score(scaled.iter())
    }

    fn score<'a>(&self, values: impl Iterator<Item = &'a f64>) -> f64 {
        self.coefficients
            .iter()
            .zip(values)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept
    }

    /// Probability that a scaled row is malignant.
    pub fn probability_malignant(&self, scaled: &[f64]) -> f64 {
        sigmoid(self.decision_function(scaled))
    }

    /// Predicted class of a scaled row.
    pub fn predict(&self, scaled: &[f64]) -> Diagnosis {
        label_for(self.probability_malignant(scaled))
    }

    /// Predicted classes of every row of a scaled matrix.
    pub fn predict_batch(&self, x: &Array2<f64>) -> Vec<Diagnosis> {
        x.rows()
            .into_iter()
            .map(|row| label_for(sigmoid(self.score(row.iter()))))
            .collect()
    }

    pub(crate) fn schema_mismatch(&self) -> Option<String> {
        if self.feature_names.len() != FEATURE_COUNT {
            return Some(format!(
                "expected {} features, found {}",
                FEATURE_COUNT,
                self.feature_names.len()
            ));
        }
        if self.coefficients.len() != FEATURE_COUNT {
            return Some(format!(
                "expected {} coefficients, found {}",
                FEATURE_COUNT,
                self.coefficients.len()
            ));
        }
        if self.feature_names != feature_names() {
            return Some("feature names or order differ from the schema".to_string());
        }
        None
    }
}

/// Malignant iff `probability_malignant >= 0.5`.
#[inline]
pub fn label_for(probability_malignant: f64) -> Diagnosis {
    if probability_malignant >= DECISION_THRESHOLD {
        Diagnosis::Malignant
    } else {
        Diagnosis::Benign
    }
}

/// Logistic regression trainer.
#[derive(Debug, Clone, Default)]
pub struct LogisticRegression {
    config: LogisticConfig,
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self { config }
    }

    /// Fit on a scaled `(rows, 30)` matrix and 0/1 targets.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Data`] for an empty or mis-shaped input and
    /// [`LearningError::TrainingFailed`] if the weights diverge.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<ModelParams> {
        let (n_samples, n_features) = x.dim();

        if n_samples == 0 {
            return Err(LearningError::Data(
                "cannot fit a classifier on zero rows".to_string(),
            ));
        }
        if n_samples != y.len() {
            return Err(LearningError::Data(format!(
                "{} rows but {} labels",
                n_samples,
                y.len()
            )));
        }
        if n_features != FEATURE_COUNT {
            return Err(LearningError::Data(format!(
                "expected {FEATURE_COUNT} features, got {n_features}"
            )));
        }

        let LogisticConfig {
            c,
            learning_rate,
            max_iter,
            tolerance,
        } = self.config;
        let n = n_samples as f64;
        let penalty = 1.0 / (c * n);

        let mut weights = Array1::<f64>::zeros(n_features);
        let mut bias = 0.0;
        let mut n_iter = 0;
        let mut converged = false;

        while n_iter < max_iter {
            let linear = x.dot(&weights) + bias;
            let errors = linear.mapv(sigmoid) - y;

            let dw = x.t().dot(&errors) / n + &weights * penalty;
            let db = errors.sum() / n;

            let grad_norm = (dw.dot(&dw) + db * db).sqrt();
            if grad_norm < tolerance {
                converged = true;
                break;
            }

            weights.scaled_add(-learning_rate, &dw);
            bias -= learning_rate * db;
            n_iter += 1;
        }

        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(LearningError::TrainingFailed(
                "gradient descent diverged; lower the learning rate".to_string(),
            ));
        }

        if converged {
            debug!("Logistic regression converged after {} iterations", n_iter);
        } else {
            warn!(
                "Logistic regression stopped at max_iter={} before reaching tolerance {}",
                max_iter, tolerance
            );
        }

        Ok(ModelParams {
            coefficients: weights.to_vec(),
            intercept: bias,
            feature_names: feature_names(),
            hyperparameters: self.config,
            n_iter,
            converged,
        })
    }
}

/// Encode labels as the 0/1 regression target.
pub(crate) fn targets(labels: &[Diagnosis]) -> Array1<f64> {
    labels.iter().map(|d| f64::from(d.label())).collect()
}

/// Fraction of rows of `x` predicted as `labels`.
pub(crate) fn accuracy_on(model: &ModelParams, x: &Array2<f64>, labels: &[Diagnosis]) -> f64 {
    let predicted = model.predict_batch(x);
    crate::metrics::accuracy(labels, &predicted)
}
