//! Held-out evaluation: accuracy and a per-class classification report.
//!
//! Wherever a ratio has a zero denominator (no predictions of a class, no
//! rows of a class) the value is reported as 0.0.

use cellscope_processing::Diagnosis;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Precision, recall and F1 for one class (or an average over classes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Number of true rows of the class in the evaluated partition.
    pub support: usize,
}

/// Counts indexed `[actual][predicted]`, 0 = benign, 1 = malignant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix(pub [[usize; 2]; 2]);

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &[Diagnosis], y_pred: &[Diagnosis]) -> Self {
        let mut counts = [[0usize; 2]; 2];
        for (actual, predicted) in y_true.iter().zip(y_pred) {
            counts[actual.label() as usize][predicted.label() as usize] += 1;
        }
        ConfusionMatrix(counts)
    }

    pub fn get(&self, actual: Diagnosis, predicted: Diagnosis) -> usize {
        self.0[actual.label() as usize][predicted.label() as usize]
    }

    pub fn total(&self) -> usize {
        self.0.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        self.0[0][0] + self.0[1][1]
    }

    fn class_metrics(&self, class: Diagnosis) -> ClassMetrics {
        let c = class.label() as usize;
        let tp = self.0[c][c];
        let predicted = self.0[0][c] + self.0[1][c];
        let support = self.0[c][0] + self.0[c][1];

        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        let f1_score = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        ClassMetrics {
            precision,
            recall,
            f1_score,
            support,
        }
    }
}

/// Metrics of a fitted model on its held-out partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Accuracy on the test partition.
    pub accuracy: f64,
    /// Accuracy on the train partition, for spotting over- or under-fit.
    pub train_accuracy: f64,
    pub benign: ClassMetrics,
    pub malignant: ClassMetrics,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub confusion_matrix: ConfusionMatrix,
    pub n_train: usize,
    pub n_test: usize,
}

impl EvaluationReport {
    /// Build the report from test-partition labels and predictions.
    pub fn from_predictions(
        y_true: &[Diagnosis],
        y_pred: &[Diagnosis],
        train_accuracy: f64,
        n_train: usize,
    ) -> Self {
        let confusion_matrix = ConfusionMatrix::from_predictions(y_true, y_pred);
        let benign = confusion_matrix.class_metrics(Diagnosis::Benign);
        let malignant = confusion_matrix.class_metrics(Diagnosis::Malignant);
        let total = benign.support + malignant.support;

        let macro_avg = ClassMetrics {
            precision: (benign.precision + malignant.precision) / 2.0,
            recall: (benign.recall + malignant.recall) / 2.0,
            f1_score: (benign.f1_score + malignant.f1_score) / 2.0,
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                (f(&benign) * benign.support as f64 + f(&malignant) * malignant.support as f64)
                    / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m: &ClassMetrics| m.precision),
            recall: weighted(|m: &ClassMetrics| m.recall),
            f1_score: weighted(|m: &ClassMetrics| m.f1_score),
            support: total,
        };

        Self {
            accuracy: ratio(confusion_matrix.correct(), confusion_matrix.total()),
            train_accuracy,
            benign,
            malignant,
            macro_avg,
            weighted_avg,
            confusion_matrix,
            n_train,
            n_test: y_true.len(),
        }
    }

    pub fn class(&self, class: Diagnosis) -> &ClassMetrics {
        match class {
            Diagnosis::Benign => &self.benign,
            Diagnosis::Malignant => &self.malignant,
        }
    }
}

/// Text table in the familiar `classification_report` layout.
impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for class in Diagnosis::ALL {
            write_row(f, class.as_str(), self.class(class))?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.n_test
        )?;
        write_row(f, "macro avg", &self.macro_avg)?;
        write_row(f, "weighted avg", &self.weighted_avg)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
        name, m.precision, m.recall, m.f1_score, m.support
    )
}

/// Fraction of positions where `y_pred` equals `y_true`; 0.0 when empty.
pub fn accuracy(y_true: &[Diagnosis], y_pred: &[Diagnosis]) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    ratio(correct, y_true.len())
}

#[inline]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellscope_processing::Diagnosis::{Benign as B, Malignant as M};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[B, M, M, B], &[B, M, B, B]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_confusion_matrix() {
        let cm = ConfusionMatrix::from_predictions(&[B, B, M, M, M], &[B, M, M, M, B]);
        assert_eq!(cm.0, [[1, 1], [1, 2]]);
        assert_eq!(cm.get(M, B), 1);
        assert_eq!(cm.total(), 5);
        assert_eq!(cm.correct(), 3);
    }

    #[test]
    fn test_report() {
        // benign: tp=1, predicted=2, support=2 -> p=0.5 r=0.5
        // malignant: tp=2, predicted=3, support=3
        let report = EvaluationReport::from_predictions(&[B, B, M, M, M], &[B, M, M, M, B], 0.9, 20);

        assert_eq!(report.accuracy, 0.6);
        assert_eq!(report.n_test, 5);
        assert_eq!(report.n_train, 20);
        assert_eq!(
            report.benign,
            ClassMetrics {
                precision: 0.5,
                recall: 0.5,
                f1_score: 0.5,
                support: 2
            }
        );
        assert!((report.malignant.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.malignant.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.macro_avg.support, 5);
        assert!((report.weighted_avg.recall - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_zero_denominators_report_zero() {
        // the model never predicts malignant and the test partition has no malignant rows
        let report = EvaluationReport::from_predictions(&[B, B], &[B, B], 1.0, 3);
        assert_eq!(report.malignant.precision, 0.0);
        assert_eq!(report.malignant.recall, 0.0);
        assert_eq!(report.malignant.f1_score, 0.0);
        assert_eq!(report.malignant.support, 0);
        assert_eq!(report.benign.f1_score, 1.0);
        assert_eq!(report.accuracy, 1.0);
    }

    #[test]
    fn test_display_layout() {
        let report = EvaluationReport::from_predictions(&[B, M], &[B, M], 1.0, 8);
        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("benign"));
        assert!(text.contains("malignant"));
        assert!(text.contains("weighted avg"));
        assert!(text.lines().any(|l| l.trim_start().starts_with("accuracy") && l.contains("1.00")));
    }
}
