//! Per-feature scaling fitted on the training partition.
//!
//! A feature that is constant on the training rows is *degenerate*: its
//! stored scale is 0 and every value of it transforms to exactly 0, whatever
//! the input. Degeneracy is decided on the raw values (min == max), not on a
//! computed standard deviation, so rounding in the mean cannot leak a tiny
//! non-zero scale.

use crate::config::ScalerKind;
use crate::error::{LearningError, Result};
use cellscope_processing::{FEATURE_COUNT, FeatureRow, feature_names};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fitted scaler statistics, one `center`/`scale` pair per feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub kind: ScalerKind,
    pub centers: Vec<f64>,
    pub scales: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl ScalerParams {
    /// Fit on the given rows.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Data`] if `rows` is empty.
    pub fn fit(kind: ScalerKind, rows: &[FeatureRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(LearningError::Data(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }

        let x = to_matrix(rows);
        let mut centers = Vec::with_capacity(FEATURE_COUNT);
        let mut scales = Vec::with_capacity(FEATURE_COUNT);

        for column in x.axis_iter(Axis(1)) {
            let (center, scale) = fit_column(kind, column);
            centers.push(center);
            scales.push(scale);
        }

        let params = Self {
            kind,
            centers,
            scales,
            feature_names: feature_names(),
        };
        debug!(
            "Fitted {} scaler on {} rows ({} degenerate features)",
            kind.as_str(),
            rows.len(),
            params.degenerate_features().len()
        );
        Ok(params)
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Indices of features whose training values were constant.
    pub fn degenerate_features(&self) -> Vec<usize> {
        self.scales
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Scale one raw row.
    pub fn transform_row(&self, row: &FeatureRow) -> FeatureRow {
        let mut out = [0.0; FEATURE_COUNT];
        for (((dst, value), center), scale) in out
            .iter_mut()
            .zip(row)
            .zip(&self.centers)
            .zip(&self.scales)
        {
            *dst = scale_value(*value, *center, *scale);
        }
        out
    }

    /// Scale many rows into a `(rows, features)` matrix.
    pub fn transform(&self, rows: &[FeatureRow]) -> Array2<f64> {
        Array2::from_shape_fn((rows.len(), FEATURE_COUNT), |(i, j)| {
            scale_value(rows[i][j], self.centers[j], self.scales[j])
        })
    }

    /// Check that the parameters describe the thirty-feature schema.
    pub(crate) fn schema_mismatch(&self) -> Option<String> {
        if self.feature_names.len() != FEATURE_COUNT {
            return Some(format!(
                "expected {} features, found {}",
                FEATURE_COUNT,
                self.feature_names.len()
            ));
        }
        if self.centers.len() != FEATURE_COUNT || self.scales.len() != FEATURE_COUNT {
            return Some(format!(
                "expected {} centers and scales, found {} and {}",
                FEATURE_COUNT,
                self.centers.len(),
                self.scales.len()
            ));
        }
        if self.feature_names != feature_names() {
            return Some("feature names or order differ from the schema".to_string());
        }
        None
    }
}

/// Raw rows as a `(rows, features)` matrix.
pub(crate) fn to_matrix(rows: &[FeatureRow]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), FEATURE_COUNT), |(i, j)| rows[i][j])
}

#[inline]
fn scale_value(value: f64, center: f64, scale: f64) -> f64 {
    if scale == 0.0 {
        0.0
    } else {
        (value - center) / scale
    }
}

fn fit_column(kind: ScalerKind, column: ArrayView1<'_, f64>) -> (f64, f64) {
    let (min, max) = column
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if min == max {
        return (min, 0.0);
    }

    match kind {
        ScalerKind::Standard => {
            let mean = column.mean().unwrap_or(0.0);
            // population std, as scikit-learn's StandardScaler
            let std = column.std(0.0);
            (mean, std)
        }
        ScalerKind::MinMax => (min, max - min),
    }
}
