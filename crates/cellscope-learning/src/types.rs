//! Request and result types of the training pipeline and the predictor.
//!
//! - [`PredictionRequest`]: thirty validated feature values in schema order
//! - [`PredictionResult`]: label plus both class probabilities
//! - [`TrainingOutcome`]: everything a fit produces

use crate::classifier::ModelParams;
use crate::error::ValidationError;
use crate::metrics::EvaluationReport;
use crate::scaler::ScalerParams;
use cellscope_processing::{Diagnosis, FEATURE_COUNT, FEATURES, Feature, FeatureRow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A validated prediction input.
///
/// Every value is finite and non-negative, and values are held in schema
/// order whatever order the caller supplied them in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRequest {
    values: FeatureRow,
}

impl PredictionRequest {
    /// Build from values already in schema order.
    pub fn from_values(values: &[f64]) -> Result<Self, ValidationError> {
        if values.len() != FEATURE_COUNT {
            return Err(ValidationError::WrongLength {
                expected: FEATURE_COUNT,
                actual: values.len(),
            });
        }

        let mut row = [0.0; FEATURE_COUNT];
        for ((dst, value), feature) in row.iter_mut().zip(values).zip(FEATURES.iter()) {
            *dst = check_value(feature, *value)?;
        }
        Ok(Self { values: row })
    }

    /// Build from a mapping of column name to number.
    ///
    /// Every schema feature must be present; keys outside the schema are
    /// rejected rather than ignored.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ValidationError> {
        let unknown: Vec<String> = map
            .keys()
            .filter(|key| Feature::from_column_name(key).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownFeatures(unknown));
        }

        let missing: Vec<String> = FEATURES
            .iter()
            .map(Feature::column_name)
            .filter(|name| !map.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFeatures(missing));
        }

        let mut row = [0.0; FEATURE_COUNT];
        for (dst, feature) in row.iter_mut().zip(FEATURES.iter()) {
            let name = feature.column_name();
            let value = &map[&name];
            let number = value.as_f64().ok_or_else(|| ValidationError::NonNumeric {
                feature: name.clone(),
                value: value.to_string(),
            })?;
            *dst = check_value(feature, number)?;
        }
        Ok(Self { values: row })
    }

    /// Build from a JSON value, which must be an object.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(ValidationError::NotAnObject),
        }
    }

    /// Parse a request from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ValidationError::InvalidJson(e.to_string()))?;
        Self::from_json(&value)
    }

    /// Values in schema order.
    pub fn values(&self) -> &FeatureRow {
        &self.values
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// The request as a column-name keyed mapping.
    pub fn to_map(&self) -> Map<String, Value> {
        FEATURES
            .iter()
            .map(|feature| (feature.column_name(), Value::from(self.get(*feature))))
            .collect()
    }
}

fn check_value(feature: &Feature, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            feature: feature.column_name(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative {
            feature: feature.column_name(),
            value,
        });
    }
    Ok(value)
}

/// The outcome of one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 0 = benign, 1 = malignant.
    pub label: u8,
    pub diagnosis: Diagnosis,
    pub probability_benign: f64,
    pub probability_malignant: f64,
}

impl PredictionResult {
    /// Result for a malignant probability; benign is its complement.
    pub(crate) fn from_probability(probability_malignant: f64) -> Self {
        let diagnosis = crate::classifier::label_for(probability_malignant);
        Self {
            label: diagnosis.label(),
            diagnosis,
            probability_benign: 1.0 - probability_malignant,
            probability_malignant,
        }
    }

    /// Probabilities indexed by label.
    pub fn probabilities(&self) -> [f64; 2] {
        [self.probability_benign, self.probability_malignant]
    }
}

/// Everything produced by a successful fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub scaler: ScalerParams,
    pub model: ModelParams,
    pub report: EvaluationReport,
    /// Wall-clock fit time in milliseconds.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellscope_processing::feature_names;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn full_map() -> Map<String, Value> {
        feature_names()
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, json!(i as f64 + 0.5)))
            .collect()
    }

    #[test]
    fn test_from_values() {
        let values: Vec<f64> = (0..FEATURE_COUNT).map(|i| i as f64).collect();
        let request = PredictionRequest::from_values(&values).unwrap();
        assert_eq!(request.values()[29], 29.0);
        assert_eq!(request.get(FEATURES[3]), 3.0);
    }

    #[test]
    fn test_from_values_wrong_length() {
        let err = PredictionRequest::from_values(&[1.0; 29]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongLength {
                expected: 30,
                actual: 29
            }
        );
        assert!(PredictionRequest::from_values(&[1.0; 31]).is_err());
    }

    #[test]
    fn test_from_values_rejects_bad_numbers() {
        let mut values = [1.0; FEATURE_COUNT];
        values[2] = f64::NAN;
        assert!(matches!(
            PredictionRequest::from_values(&values),
            Err(ValidationError::NonFinite { ref feature }) if feature == "perimeter_mean"
        ));

        values[2] = f64::INFINITY;
        assert!(PredictionRequest::from_values(&values).is_err());

        values[2] = -0.5;
        assert!(matches!(
            PredictionRequest::from_values(&values),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_zero_is_valid() {
        assert!(PredictionRequest::from_values(&[0.0; FEATURE_COUNT]).is_ok());
    }

    #[test]
    fn test_from_map_orders_by_schema() {
        let request = PredictionRequest::from_map(&full_map()).unwrap();
        assert_eq!(request.values()[0], 0.5);
        assert_eq!(request.values()[29], 29.5);
        assert_eq!(request.to_map(), full_map());
    }

    #[test]
    fn test_from_map_missing_feature() {
        let mut map = full_map();
        map.remove("concave points_worst");
        let err = PredictionRequest::from_map(&map).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFeatures(vec!["concave points_worst".to_string()])
        );
    }

    #[test]
    fn test_from_map_unknown_feature() {
        let mut map = full_map();
        map.insert("id".to_string(), json!(842302));
        let err = PredictionRequest::from_map(&map).unwrap_err();
        assert_eq!(err, ValidationError::UnknownFeatures(vec!["id".to_string()]));
    }

    #[test]
    fn test_from_map_non_numeric() {
        let mut map = full_map();
        map.insert("area_mean".to_string(), json!("large"));
        let err = PredictionRequest::from_map(&map).unwrap_err();
        assert!(matches!(err, ValidationError::NonNumeric { ref feature, .. } if feature == "area_mean"));

        map.insert("area_mean".to_string(), Value::Null);
        assert!(PredictionRequest::from_map(&map).is_err());
    }

    #[test]
    fn test_from_json_requires_object() {
        assert_eq!(
            PredictionRequest::from_json(&json!([1, 2, 3])).unwrap_err(),
            ValidationError::NotAnObject
        );
        assert!(PredictionRequest::from_json(&Value::Object(full_map())).is_ok());
    }

    #[test]
    fn test_from_json_str() {
        let err = PredictionRequest::from_json_str("radius_mean=1").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidJson(_)));
        assert!(err.to_string().starts_with("request is not valid JSON"));

        let text = Value::Object(full_map()).to_string();
        assert_eq!(
            PredictionRequest::from_json_str(&text).unwrap(),
            PredictionRequest::from_json(&Value::Object(full_map())).unwrap()
        );
    }

    #[test]
    fn test_prediction_result_serializes() {
        let result = PredictionResult::from_probability(0.75);
        assert_eq!(result.label, 1);
        assert_eq!(result.probabilities(), [0.25, 0.75]);

        let json = serde_json::to_value(result).unwrap();
        assert_eq!(
            json,
            json!({
                "label": 1,
                "diagnosis": "malignant",
                "probability_benign": 0.25,
                "probability_malignant": 0.75
            })
        );
    }
}
