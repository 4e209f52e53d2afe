//! The cleaned, immutable dataset shared by training and display.

use crate::schema::{Diagnosis, FEATURE_COUNT, FEATURES, Feature};
use serde::{Deserialize, Serialize};

/// One row of feature values, in schema order.
pub type FeatureRow = [f64; FEATURE_COUNT];

/// A dataset with identifier and artifact columns removed and the diagnosis
/// encoded.
///
/// Constructed once by the cleaner and never mutated afterwards; share it
/// with `Arc<CleanedDataset>` instead of reloading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedDataset {
    rows: Vec<FeatureRow>,
    labels: Vec<Diagnosis>,
}

impl CleanedDataset {
    /// Build a dataset from rows and labels of equal length.
    ///
    /// Returns `None` when the lengths differ.
    pub fn new(rows: Vec<FeatureRow>, labels: Vec<Diagnosis>) -> Option<Self> {
        if rows.len() != labels.len() {
            return None;
        }
        Some(Self { rows, labels })
    }

    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&FeatureRow> {
        self.rows.get(index)
    }

    pub fn labels(&self) -> &[Diagnosis] {
        &self.labels
    }

    /// Labels as 0/1 values.
    pub fn label_values(&self) -> Vec<u8> {
        self.labels.iter().map(Diagnosis::label).collect()
    }

    /// All values of one feature, in row order.
    pub fn feature_column(&self, feature: Feature) -> Vec<f64> {
        let index = feature.index();
        self.rows.iter().map(|row| row[index]).collect()
    }

    /// Sample counts as `(benign, malignant)`.
    pub fn class_counts(&self) -> (usize, usize) {
        let malignant = self
            .labels
            .iter()
            .filter(|d| **d == Diagnosis::Malignant)
            .count();
        (self.labels.len() - malignant, malignant)
    }

    /// Number of distinct classes present.
    pub fn n_classes(&self) -> usize {
        let (benign, malignant) = self.class_counts();
        usize::from(benign > 0) + usize::from(malignant > 0)
    }

    /// Copy out the rows at `indices`, preserving the given order.
    pub fn subset(&self, indices: &[usize]) -> Option<CleanedDataset> {
        let mut rows = Vec::with_capacity(indices.len());
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            rows.push(*self.rows.get(i)?);
            labels.push(*self.labels.get(i)?);
        }
        Some(CleanedDataset { rows, labels })
    }
}

/// What the cleaner did to a raw source, for logging and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub benign: usize,
    pub malignant: usize,
    /// Columns removed from the raw source (identifier, artifacts, unknown).
    pub dropped_columns: Vec<String>,
}

impl DatasetSummary {
    pub fn feature_count(&self) -> usize {
        FEATURES.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(value: f64) -> FeatureRow {
        [value; FEATURE_COUNT]
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        assert!(CleanedDataset::new(vec![row(1.0)], vec![]).is_none());
    }

    #[test]
    fn test_class_counts() {
        let ds = CleanedDataset::new(
            vec![row(1.0), row(2.0), row(3.0)],
            vec![Diagnosis::Benign, Diagnosis::Malignant, Diagnosis::Benign],
        )
        .unwrap();
        assert_eq!(ds.class_counts(), (2, 1));
        assert_eq!(ds.n_classes(), 2);
        assert_eq!(ds.label_values(), vec![0, 1, 0]);
    }

    #[test]
    fn test_single_class() {
        let ds = CleanedDataset::new(vec![row(1.0)], vec![Diagnosis::Malignant]).unwrap();
        assert_eq!(ds.n_classes(), 1);
    }

    #[test]
    fn test_feature_column_and_subset() {
        let mut first = row(0.0);
        first[FEATURES[3].index()] = 42.0;
        let ds = CleanedDataset::new(
            vec![first, row(7.0)],
            vec![Diagnosis::Benign, Diagnosis::Malignant],
        )
        .unwrap();

        assert_eq!(ds.feature_column(FEATURES[3]), vec![42.0, 7.0]);

        let sub = ds.subset(&[1, 0]).unwrap();
        assert_eq!(sub.labels(), &[Diagnosis::Malignant, Diagnosis::Benign]);
        assert_eq!(sub.row(1).unwrap()[3], 42.0);
        assert!(ds.subset(&[5]).is_none());
    }
}
