//! Data the interactive form needs: slider ranges and radar-chart values.
//!
//! Everything here is computed from the FULL cleaned dataset and exists only
//! for display. It is deliberately a different type from the training
//! scaler; feeding these values to the classifier would silently corrupt
//! predictions.

use crate::dataset::{CleanedDataset, FeatureRow};
use crate::schema::{Aggregate, FEATURE_COUNT, FEATURES, Feature, Measurement};
use crate::utils::{min_max_mean, min_max_normalize};
use serde::{Deserialize, Serialize};

/// Observed range of one feature across the full dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Per-feature ranges over the full dataset, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRanges {
    ranges: Vec<FeatureRange>,
}

/// Configuration for one form slider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderSpec {
    /// Dataset column name, also the key of the prediction request.
    pub key: String,
    pub label: String,
    pub group: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

/// One polygon of the radar chart: ten normalized values, one per measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarTrace {
    pub name: String,
    pub values: Vec<f64>,
}

/// Radar-chart data for a single input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarChart {
    /// Axis labels, in measurement order.
    pub categories: Vec<String>,
    /// Mean, standard-error and worst traces, in that order.
    pub traces: Vec<RadarTrace>,
}

impl DisplayRanges {
    /// Compute ranges over every row of `dataset`.
    ///
    /// Returns `None` for an empty dataset.
    pub fn from_dataset(dataset: &CleanedDataset) -> Option<Self> {
        let ranges = FEATURES
            .iter()
            .map(|feature| {
                let (min, max, mean) = min_max_mean(&dataset.feature_column(*feature))?;
                Some(FeatureRange { min, max, mean })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { ranges })
    }

    pub fn get(&self, feature: Feature) -> FeatureRange {
        self.ranges[feature.index()]
    }

    pub fn ranges(&self) -> &[FeatureRange] {
        &self.ranges
    }

    /// Slider controls: from zero to the dataset maximum, defaulting to the mean.
    pub fn slider_specs(&self) -> Vec<SliderSpec> {
        FEATURES
            .iter()
            .map(|feature| {
                let range = self.get(*feature);
                SliderSpec {
                    key: feature.column_name(),
                    label: feature.label(),
                    group: feature.aggregate.group_name().to_string(),
                    min: 0.0,
                    max: range.max,
                    default: range.mean,
                }
            })
            .collect()
    }

    /// The slider defaults as a feature row.
    pub fn default_row(&self) -> FeatureRow {
        let mut row = [0.0; FEATURE_COUNT];
        for (value, range) in row.iter_mut().zip(&self.ranges) {
            *value = range.mean;
        }
        row
    }

    /// Normalize a raw input row against the full-dataset ranges.
    ///
    /// A feature that is constant across the dataset normalizes to 0.
    pub fn normalize(&self, row: &FeatureRow) -> FeatureRow {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, range) in self.ranges.iter().enumerate() {
            out[i] = min_max_normalize(row[i], range.min, range.max);
        }
        out
    }

    /// Radar-chart values for a raw input row.
    pub fn radar_chart(&self, row: &FeatureRow) -> RadarChart {
        let normalized = self.normalize(row);
        let traces = Aggregate::ALL
            .iter()
            .map(|aggregate| RadarTrace {
                name: trace_name(*aggregate).to_string(),
                values: Measurement::ALL
                    .iter()
                    .map(|measurement| {
                        let feature = Feature {
                            measurement: *measurement,
                            aggregate: *aggregate,
                        };
                        normalized[feature.index()]
                    })
                    .collect(),
            })
            .collect();

        RadarChart {
            categories: Measurement::ALL
                .iter()
                .map(|m| m.display_name().to_string())
                .collect(),
            traces,
        }
    }
}

fn trace_name(aggregate: Aggregate) -> &'static str {
    match aggregate {
        Aggregate::Mean => "Mean Value",
        Aggregate::StandardError => "Standard Error",
        Aggregate::Worst => "Worst Value",
    }
}
