//! The fixed, ordered feature schema.
//!
//! Thirty features are derived from ten [`Measurement`]s taken under three
//! [`Aggregate`]s. The classifier and scaler are position-dependent, so the
//! order of [`FEATURES`] is the contract every component shares: all `_mean`
//! columns first, then `_se`, then `_worst`, measurements in declaration order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of feature columns in the schema.
pub const FEATURE_COUNT: usize = 30;

/// Name of the label column in the raw dataset.
pub const LABEL_COLUMN: &str = "diagnosis";

/// Name of the identifier column in the raw dataset.
pub const ID_COLUMN: &str = "id";

/// A base measurement of a cell nucleus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    Radius,
    Texture,
    Perimeter,
    Area,
    Smoothness,
    Compactness,
    Concavity,
    ConcavePoints,
    Symmetry,
    FractalDimension,
}

impl Measurement {
    /// All measurements, in schema order.
    pub const ALL: [Measurement; 10] = [
        Measurement::Radius,
        Measurement::Texture,
        Measurement::Perimeter,
        Measurement::Area,
        Measurement::Smoothness,
        Measurement::Compactness,
        Measurement::Concavity,
        Measurement::ConcavePoints,
        Measurement::Symmetry,
        Measurement::FractalDimension,
    ];

    /// Column-name stem used in the dataset header.
    ///
    /// Note the dataset's own inconsistency: `concave points` uses a space.
    pub fn column_stem(&self) -> &'static str {
        match self {
            Measurement::Radius => "radius",
            Measurement::Texture => "texture",
            Measurement::Perimeter => "perimeter",
            Measurement::Area => "area",
            Measurement::Smoothness => "smoothness",
            Measurement::Compactness => "compactness",
            Measurement::Concavity => "concavity",
            Measurement::ConcavePoints => "concave points",
            Measurement::Symmetry => "symmetry",
            Measurement::FractalDimension => "fractal_dimension",
        }
    }

    /// Human-readable name, e.g. for radar-chart axes.
    pub fn display_name(&self) -> &'static str {
        match self {
            Measurement::Radius => "Radius",
            Measurement::Texture => "Texture",
            Measurement::Perimeter => "Perimeter",
            Measurement::Area => "Area",
            Measurement::Smoothness => "Smoothness",
            Measurement::Compactness => "Compactness",
            Measurement::Concavity => "Concavity",
            Measurement::ConcavePoints => "Concave Points",
            Measurement::Symmetry => "Symmetry",
            Measurement::FractalDimension => "Fractal Dimension",
        }
    }
}

/// How a measurement was aggregated over the nuclei in one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Mean,
    StandardError,
    Worst,
}

impl Aggregate {
    /// All aggregates, in schema order.
    pub const ALL: [Aggregate; 3] = [Aggregate::Mean, Aggregate::StandardError, Aggregate::Worst];

    /// Column-name suffix used in the dataset header.
    pub fn suffix(&self) -> &'static str {
        match self {
            Aggregate::Mean => "mean",
            Aggregate::StandardError => "se",
            Aggregate::Worst => "worst",
        }
    }

    /// Group heading for form controls.
    pub fn group_name(&self) -> &'static str {
        match self {
            Aggregate::Mean => "Mean Values",
            Aggregate::StandardError => "Standard Error",
            Aggregate::Worst => "Worst Values",
        }
    }
}

/// One of the thirty feature columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feature {
    pub measurement: Measurement,
    pub aggregate: Aggregate,
}

const fn feature(measurement: Measurement, aggregate: Aggregate) -> Feature {
    Feature {
        measurement,
        aggregate,
    }
}

/// The ordered feature schema.
pub const FEATURES: [Feature; FEATURE_COUNT] = {
    use Aggregate::*;
    use Measurement::*;
    [
        feature(Radius, Mean),
        feature(Texture, Mean),
        feature(Perimeter, Mean),
        feature(Area, Mean),
        feature(Smoothness, Mean),
        feature(Compactness, Mean),
        feature(Concavity, Mean),
        feature(ConcavePoints, Mean),
        feature(Symmetry, Mean),
        feature(FractalDimension, Mean),
        feature(Radius, StandardError),
        feature(Texture, StandardError),
        feature(Perimeter, StandardError),
        feature(Area, StandardError),
        feature(Smoothness, StandardError),
        feature(Compactness, StandardError),
        feature(Concavity, StandardError),
        feature(ConcavePoints, StandardError),
        feature(Symmetry, StandardError),
        feature(FractalDimension, StandardError),
        feature(Radius, Worst),
        feature(Texture, Worst),
        feature(Perimeter, Worst),
        feature(Area, Worst),
        feature(Smoothness, Worst),
        feature(Compactness, Worst),
        feature(Concavity, Worst),
        feature(ConcavePoints, Worst),
        feature(Symmetry, Worst),
        feature(FractalDimension, Worst),
    ]
};

impl Feature {
    /// Position of this feature in [`FEATURES`].
    pub fn index(&self) -> usize {
        let aggregate = match self.aggregate {
            Aggregate::Mean => 0,
            Aggregate::StandardError => 1,
            Aggregate::Worst => 2,
        };
        aggregate * Measurement::ALL.len() + self.measurement as usize
    }

    /// Column name exactly as it appears in the dataset header.
    pub fn column_name(&self) -> String {
        format!("{}_{}", self.measurement.column_stem(), self.aggregate.suffix())
    }

    /// Label for a form control, e.g. `"Concave points (se)"`.
    pub fn label(&self) -> String {
        let stem = self.measurement.column_stem().replace('_', " ");
        let mut chars = stem.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{} ({})", capitalized, self.aggregate.suffix())
    }

    /// Look up a feature by its dataset column name.
    pub fn from_column_name(name: &str) -> Option<Feature> {
        FEATURES.iter().copied().find(|f| f.column_name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.column_name())
    }
}

/// Column names of the schema, in order.
pub fn feature_names() -> Vec<String> {
    FEATURES.iter().map(Feature::column_name).collect()
}

/// Check that `names` is exactly the schema, in order.
pub fn matches_schema<S: AsRef<str>>(names: &[S]) -> bool {
    names.len() == FEATURE_COUNT
        && names
            .iter()
            .zip(FEATURES.iter())
            .all(|(name, feature)| name.as_ref() == feature.column_name())
}

/// The target class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Diagnosis {
    Benign = 0,
    Malignant = 1,
}

impl Diagnosis {
    /// Both classes, ordered by label.
    pub const ALL: [Diagnosis; 2] = [Diagnosis::Benign, Diagnosis::Malignant];

    /// Decode the single-letter code used in the dataset.
    pub fn from_code(code: &str) -> Option<Diagnosis> {
        match code.trim() {
            "B" => Some(Diagnosis::Benign),
            "M" => Some(Diagnosis::Malignant),
            _ => None,
        }
    }

    /// Numeric class label (0 = benign, 1 = malignant).
    pub fn label(&self) -> u8 {
        *self as u8
    }

    pub fn from_label(label: u8) -> Option<Diagnosis> {
        match label {
            0 => Some(Diagnosis::Benign),
            1 => Some(Diagnosis::Malignant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnosis::Benign => "benign",
            Diagnosis::Malignant => "malignant",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
