//! Data preparation for the cell-nuclei diagnosis pipeline.
//!
//! This crate turns a raw breast-mass cytology dataset into a clean,
//! fixed-order feature matrix with encoded labels. It knows nothing about
//! models; training and inference live in `cellscope-learning`.
//!
//! # Overview
//!
//! - **Schema**: the thirty features as an explicit ordered list ([`FEATURES`])
//! - **Loading**: CSV files or buffers via Polars, with lenient fallbacks
//! - **Cleaning**: drop identifier/artifact columns, encode `M`/`B` labels
//! - **Display**: full-dataset ranges for form sliders and radar charts
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cellscope_processing::{load_and_clean, DisplayRanges};
//! use std::sync::Arc;
//!
//! // Load once, share everywhere
//! let (dataset, summary) = load_and_clean("data/data.csv")?;
//! let dataset = Arc::new(dataset);
//!
//! println!("{} rows, {} malignant", summary.rows, summary.malignant);
//!
//! let ranges = DisplayRanges::from_dataset(&dataset).expect("non-empty dataset");
//! for slider in ranges.slider_specs() {
//!     println!("{}: 0..{:.2} (default {:.2})", slider.label, slider.max, slider.default);
//! }
//! ```

pub mod cleaner;
pub mod dataset;
pub mod display;
pub mod error;
pub mod loader;
pub mod schema;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::DataCleaner;
pub use dataset::{CleanedDataset, DatasetSummary, FeatureRow};
pub use display::{DisplayRanges, FeatureRange, RadarChart, RadarTrace, SliderSpec};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use loader::{DataSource, load_csv_bytes, load_csv_with_fallbacks};
pub use schema::{
    Aggregate, Diagnosis, FEATURE_COUNT, FEATURES, Feature, ID_COLUMN, LABEL_COLUMN, Measurement,
    feature_names, matches_schema,
};

use tracing::info;

static_assertions::assert_impl_all!(CleanedDataset: Send, Sync);

/// Load a raw dataset and clean it.
///
/// # Errors
///
/// Returns a schema error if expected columns are absent, the dataset is
/// empty, or a label is not `M`/`B`; an IO or Polars error if the source
/// cannot be read at all.
pub fn load_and_clean(
    source: impl Into<DataSource>,
) -> ProcessingResult<(CleanedDataset, DatasetSummary)> {
    let source = source.into();
    if let DataSource::Path(ref path) = source {
        info!("Loading dataset from: {}", path.display());
    }
    let df = source.into_frame()?;
    DataCleaner.clean(&df)
}
