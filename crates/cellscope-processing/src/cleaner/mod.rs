//! Turns a raw frame into a [`CleanedDataset`].
//!
//! The cleaner:
//! - drops the identifier column and columns that carry no data
//! - drops any other column outside the schema (with a warning)
//! - reads the thirty features in schema order, regardless of header order
//! - encodes the diagnosis as benign/malignant
//!
//! It never imputes: a missing, non-finite or negative feature value or an
//! unknown label is a schema error, reported with the 1-based data row it
//! occurred on.

mod sanitizers;

use crate::dataset::{CleanedDataset, DatasetSummary, FeatureRow};
use crate::error::{ProcessingError, Result};
use crate::schema::{Diagnosis, FEATURE_COUNT, FEATURES, Feature, ID_COLUMN, LABEL_COLUMN};
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use sanitizers::{describe_label, is_artifact_column_name, is_fully_empty};
use tracing::{debug, info, warn};

/// Dataset cleaner for the fixed cell-nuclei schema.
pub struct DataCleaner;

impl DataCleaner {
    /// Clean a raw frame.
    ///
    /// # Errors
    ///
    /// Returns a schema error ([`ProcessingError::is_schema_error`]) when a
    /// schema column is missing, the frame has no rows, a feature is
    /// non-numeric or empty, or a label is not `M`/`B`.
    pub fn clean(&self, df: &DataFrame) -> Result<(CleanedDataset, DatasetSummary)> {
        info!("Cleaning dataset with shape {:?}", df.shape());

        let dropped_columns = self.columns_to_drop(df);
        self.check_required_columns(df)?;

        if df.height() == 0 {
            return Err(ProcessingError::EmptyDataset);
        }

        let labels = self.encode_labels(df)?;
        let rows = self.read_features(df)?;

        let dataset = CleanedDataset::new(rows, labels).ok_or_else(|| {
            ProcessingError::MissingColumns(vec![LABEL_COLUMN.to_string()])
        })?;

        let (benign, malignant) = dataset.class_counts();
        let summary = DatasetSummary {
            rows: dataset.n_samples(),
            benign,
            malignant,
            dropped_columns,
        };

        info!(
            "Cleaned dataset: {} rows ({} benign, {} malignant), dropped {:?}",
            summary.rows, summary.benign, summary.malignant, summary.dropped_columns
        );

        Ok((dataset, summary))
    }

    /// Names of every column that will not be carried into the cleaned dataset.
    fn columns_to_drop(&self, df: &DataFrame) -> Vec<String> {
        let mut dropped = Vec::new();

        for column in df.get_columns() {
            let name = column.name().as_str();

            if name == LABEL_COLUMN || Feature::from_column_name(name).is_some() {
                continue;
            }

            if name == ID_COLUMN {
                debug!("Dropping identifier column '{}'", name);
            } else if is_artifact_column_name(name)
                || is_fully_empty(column.as_materialized_series())
            {
                debug!("Dropping artifact column '{}'", name);
            } else {
                warn!("Dropping column '{}' which is not part of the schema", name);
            }
            dropped.push(name.to_string());
        }

        dropped
    }

    fn check_required_columns(&self, df: &DataFrame) -> Result<()> {
        let mut missing: Vec<String> = FEATURES
            .iter()
            .map(Feature::column_name)
            .filter(|name| df.column(name).is_err())
            .collect();

        if df.column(LABEL_COLUMN).is_err() {
            missing.push(LABEL_COLUMN.to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProcessingError::MissingColumns(missing))
        }
    }

    fn encode_labels(&self, df: &DataFrame) -> Result<Vec<Diagnosis>> {
        let series = df
            .column(LABEL_COLUMN)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let values = series.str()?;

        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                value
                    .and_then(Diagnosis::from_code)
                    .ok_or_else(|| ProcessingError::InvalidLabel {
                        row: i + 1,
                        value: describe_label(value),
                    })
            })
            .collect()
    }

    fn read_features(&self, df: &DataFrame) -> Result<Vec<FeatureRow>> {
        let mut rows = vec![[0.0; FEATURE_COUNT]; df.height()];

        for feature in FEATURES.iter() {
            let name = feature.column_name();
            let series = df.column(&name)?.as_materialized_series();

            if !is_numeric_dtype(series.dtype()) {
                return Err(ProcessingError::NonNumericColumn {
                    column: name,
                    reason: format!("found dtype {}", series.dtype()),
                });
            }

            let floats = series.cast(&DataType::Float64)?;
            let index = feature.index();
            for (i, value) in floats.f64()?.into_iter().enumerate() {
                match value {
                    Some(v) if !v.is_finite() => {
                        return Err(ProcessingError::NonFiniteValue {
                            column: name,
                            row: i + 1,
                        });
                    }
                    Some(v) if v < 0.0 => {
                        return Err(ProcessingError::NegativeValue {
                            column: name,
                            row: i + 1,
                            value: v,
                        });
                    }
                    Some(v) => rows[i][index] = v,
                    None => {
                        return Err(ProcessingError::MissingValue {
                            column: name,
                            row: i + 1,
                        });
                    }
                }
            }
        }

        Ok(rows)
    }
}
