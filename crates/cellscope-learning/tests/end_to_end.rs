//! End-to-end tests: load, fit, persist, reload and predict.
//!
//! The dataset fixture lives with the processing crate so both crates test
//! against the same file.

use cellscope_learning::split::train_test_split;
use cellscope_learning::{
    ArtifactStore, LearningError, ModelParams, PredictionRequest, Predictor, ScalerKind,
    ScalerParams, SharedPredictor, TestSize, TrainingConfig, TrainingPipeline, ValidationError,
};
use cellscope_processing::{
    CleanedDataset, Diagnosis, DisplayRanges, FEATURE_COUNT, Feature, feature_names,
    load_and_clean,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::path::PathBuf;
use tempfile::tempdir;

// ============================================================================
// Helper Functions
// ============================================================================

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../cellscope-processing/tests/fixtures/wdbc_sample.csv")
}

fn sample() -> CleanedDataset {
    load_and_clean(sample_path()).expect("sample should load").0
}

fn pipeline(test_size: TestSize, seed: u64) -> TrainingPipeline {
    TrainingPipeline::builder()
        .config(
            TrainingConfig::builder()
                .test_size(test_size)
                .random_seed(seed)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

fn request_json(row: &[f64; FEATURE_COUNT]) -> Value {
    Value::Object(PredictionRequest::from_values(row).unwrap().to_map())
}

// ============================================================================
// Training
// ============================================================================

#[test]
fn test_fit_sample_dataset() {
    let dataset = sample();
    let outcome = cellscope_learning::fit(&dataset, TestSize::Count(14), 1).unwrap();

    assert_eq!(outcome.report.n_test, 14);
    assert_eq!(outcome.report.n_train, 56);
    assert_eq!(outcome.report.confusion_matrix.total(), 14);
    assert!(outcome.report.accuracy >= 0.8, "accuracy {}", outcome.report.accuracy);
    assert!(outcome.report.train_accuracy >= 0.9);
    assert_eq!(outcome.scaler.feature_names, feature_names());
    assert_eq!(outcome.model.feature_names, feature_names());
    assert!(outcome.model.coefficients.iter().all(|c| c.is_finite()));
}

#[test]
fn test_same_seed_same_artifacts() {
    let dataset = sample();
    let a = cellscope_learning::fit(&dataset, TestSize::Fraction(0.2), 7).unwrap();
    let b = cellscope_learning::fit(&dataset, TestSize::Fraction(0.2), 7).unwrap();

    assert_eq!(a.scaler, b.scaler);
    assert_eq!(a.model, b.model);
    assert_eq!(a.report, b.report);
}

#[test]
fn test_scaler_sees_train_partition_only() {
    let dataset = sample();
    let outcome = cellscope_learning::fit(&dataset, TestSize::Count(20), 3).unwrap();

    let split = train_test_split(dataset.n_samples(), TestSize::Count(20), 3).unwrap();
    let train = dataset.subset(&split.train).unwrap();
    let expected = ScalerParams::fit(ScalerKind::Standard, train.rows()).unwrap();

    assert_eq!(outcome.scaler, expected);
}

#[test]
fn test_minmax_scaler_pipeline() {
    let pipeline = TrainingPipeline::builder()
        .config(
            TrainingConfig::builder()
                .scaler(ScalerKind::MinMax)
                .test_count(10)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let outcome = pipeline.fit(&sample()).unwrap();

    assert_eq!(outcome.scaler.kind, ScalerKind::MinMax);
    assert!(outcome.report.accuracy >= 0.8);
}

#[test]
fn test_degenerate_feature_scales_to_zero() {
    let dataset = sample();
    let smoothness = Feature::from_column_name("smoothness_se").unwrap().index();
    let rows = dataset
        .rows()
        .iter()
        .map(|row| {
            let mut row = *row;
            row[smoothness] = 0.005;
            row
        })
        .collect();
    let dataset = CleanedDataset::new(rows, dataset.labels().to_vec()).unwrap();

    let outcome = cellscope_learning::fit(&dataset, TestSize::Count(10), 1).unwrap();
    assert_eq!(outcome.scaler.scales[smoothness], 0.0);
    assert_eq!(outcome.scaler.degenerate_features(), vec![smoothness]);
    assert_eq!(outcome.model.coefficients[smoothness], 0.0);

    // any value of a constant feature, including an out-of-range one, scales to 0
    let mut row = *dataset.row(0).unwrap();
    for value in [0.0, 0.005, 3.0] {
        row[smoothness] = value;
        assert_eq!(outcome.scaler.transform_row(&row)[smoothness], 0.0);
    }
}

#[test]
fn test_single_class_dataset_rejected() {
    let dataset = sample();
    let benign: Vec<usize> = (0..dataset.n_samples())
        .filter(|&i| dataset.labels()[i] == Diagnosis::Benign)
        .collect();
    let only_benign = dataset.subset(&benign).unwrap();

    let err = cellscope_learning::fit(&only_benign, TestSize::Count(5), 1).unwrap_err();
    assert!(matches!(err, LearningError::Data(_)));
}

#[test]
fn test_two_row_dataset() {
    let mut benign = [1.0; FEATURE_COUNT];
    benign[0] = 10.0;
    let mut malignant = [2.0; FEATURE_COUNT];
    malignant[0] = 20.0;
    let dataset =
        CleanedDataset::new(vec![benign, malignant], vec![Diagnosis::Benign, Diagnosis::Malignant])
            .unwrap();

    for seed in [0, 1, 2, 3] {
        let outcome = cellscope_learning::fit(&dataset, TestSize::Count(1), seed).unwrap();
        let split = train_test_split(2, TestSize::Count(1), seed).unwrap();
        let train_label = dataset.labels()[split.train[0]];

        // one training row: every feature is constant, so every input scales to zeros
        assert_eq!(outcome.scaler.degenerate_features().len(), FEATURE_COUNT);
        assert_eq!(outcome.scaler.transform_row(&benign), [0.0; FEATURE_COUNT]);
        assert!(outcome.model.coefficients.iter().all(|&c| c == 0.0));

        let predictor = Predictor::new(outcome.scaler, outcome.model).unwrap();
        for row in [&benign, &malignant] {
            let result = predictor.predict_row(row);
            assert_eq!(result.diagnosis, train_label, "seed {seed}");
            assert!((result.probability_benign + result.probability_malignant - 1.0).abs() < 1e-12);
        }
    }
}

// ============================================================================
// Persistence and Inference
// ============================================================================

#[test]
fn test_run_then_predict() {
    let dataset = sample();
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());

    let outcome = pipeline(TestSize::Count(14), 1).run(&dataset, &store).unwrap();
    assert!(dir.path().join("scaler.bin").is_file());
    assert!(dir.path().join("model.bin").is_file());

    let predictor = Predictor::load(dir.path()).unwrap();
    assert_eq!(predictor.scaler(), &outcome.scaler);
    assert_eq!(predictor.model(), &outcome.model);

    for row in dataset.rows() {
        let expected = outcome.model.predict(&outcome.scaler.transform_row(row));
        let result = predictor.predict_json(&request_json(row)).unwrap();
        assert_eq!(result.diagnosis, expected);
        assert_eq!(result.label, expected.label());
        assert!((result.probabilities().iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_reloaded_parameters_are_bit_identical() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let outcome = pipeline(TestSize::Fraction(0.2), 1).run(&sample(), &store).unwrap();

    let scaler: ScalerParams = store.load().unwrap();
    let model: ModelParams = store.load().unwrap();

    let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&scaler.centers), bits(&outcome.scaler.centers));
    assert_eq!(bits(&scaler.scales), bits(&outcome.scaler.scales));
    assert_eq!(bits(&model.coefficients), bits(&outcome.model.coefficients));
    assert_eq!(model.intercept.to_bits(), outcome.model.intercept.to_bits());
}

#[test]
fn test_one_shot_predict() {
    let dataset = sample();
    let dir = tempdir().unwrap();
    pipeline(TestSize::Count(10), 1)
        .run(&dataset, &ArtifactStore::new(dir.path()))
        .unwrap();

    let result =
        cellscope_learning::predict(dir.path(), &request_json(dataset.row(0).unwrap())).unwrap();
    assert!((result.probability_benign + result.probability_malignant - 1.0).abs() < 1e-12);
}

#[test]
fn test_missing_feature_is_validation_error() {
    let dataset = sample();
    let dir = tempdir().unwrap();
    pipeline(TestSize::Count(10), 1)
        .run(&dataset, &ArtifactStore::new(dir.path()))
        .unwrap();
    let predictor = Predictor::load(dir.path()).unwrap();

    let mut request = request_json(dataset.row(0).unwrap());
    request.as_object_mut().unwrap().remove("texture_worst");

    let err = predictor.predict_json(&request).unwrap_err();
    assert!(err.is_request_error());
    assert!(matches!(
        err,
        LearningError::Validation(ValidationError::MissingFeatures(ref names))
            if names == &vec!["texture_worst".to_string()]
    ));

    // the predictor stays usable after a rejected request
    assert!(predictor.predict_json(&request_json(dataset.row(1).unwrap())).is_ok());
}

#[test]
fn test_missing_artifacts() {
    let dir = tempdir().unwrap();
    let err = Predictor::load(dir.path()).unwrap_err();
    assert_eq!(err.error_code(), "ARTIFACT_MISSING");

    let err = cellscope_learning::predict(dir.path(), &json!({})).unwrap_err();
    assert!(matches!(err, LearningError::ArtifactMissing { .. }));
}

#[test]
fn test_artifact_with_wrong_feature_count() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let outcome = pipeline(TestSize::Count(10), 1).run(&sample(), &store).unwrap();

    let mut scaler = outcome.scaler;
    scaler.centers.pop();
    scaler.scales.pop();
    scaler.feature_names.pop();
    store.save_pair(&scaler, &outcome.model).unwrap();

    let err = Predictor::load(dir.path()).unwrap_err();
    assert_eq!(err.error_code(), "ARTIFACT_SCHEMA");
    assert!(matches!(err, LearningError::ArtifactSchema { ref name, .. } if name == "scaler"));
}

#[test]
fn test_scaler_from_another_fit_is_rejected() {
    let dataset = sample();
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    pipeline(TestSize::Count(10), 1).run(&dataset, &store).unwrap();
    let shared = SharedPredictor::load(dir.path()).unwrap();
    let before = shared.current();

    // a second fit whose scaler alone lands next to the first model
    let other = pipeline(TestSize::Count(10), 2).fit(&dataset).unwrap();
    assert_ne!(&other.scaler, before.scaler());
    store.save(&other.scaler).unwrap();

    let err = Predictor::load(dir.path()).unwrap_err();
    assert_eq!(err.error_code(), "ARTIFACT_SCHEMA");
    assert!(err.to_string().contains("different fits"));

    assert!(shared.reload().is_err());
    assert_eq!(shared.current().as_ref(), before.as_ref());
}

#[test]
fn test_failed_fit_keeps_artifacts() {
    let dataset = sample();
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    pipeline(TestSize::Count(10), 1).run(&dataset, &store).unwrap();
    let before = Predictor::load(dir.path()).unwrap();

    let single = dataset.subset(&[0, 1]).unwrap();
    assert_eq!(single.n_classes(), 1);
    assert!(pipeline(TestSize::Count(1), 1).run(&single, &store).is_err());

    assert_eq!(Predictor::load(dir.path()).unwrap(), before);
}

#[test]
fn test_shared_predictor_picks_up_retrained_artifacts() {
    let dataset = sample();
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    pipeline(TestSize::Count(10), 1).run(&dataset, &store).unwrap();

    let shared = SharedPredictor::load(dir.path()).unwrap();
    let first = shared.current();

    let retrained = pipeline(TestSize::Count(10), 2).run(&dataset, &store).unwrap();
    shared.reload().unwrap();

    assert_eq!(shared.current().model(), &retrained.model);
    assert_eq!(first.model().feature_names, retrained.model.feature_names);
}

// ============================================================================
// Display Values Stay Separate From Model Scaling
// ============================================================================

#[test]
fn test_radar_values_use_full_dataset() {
    let dataset = sample();
    let outcome = cellscope_learning::fit(&dataset, TestSize::Count(20), 1).unwrap();
    let ranges = DisplayRanges::from_dataset(&dataset).unwrap();

    let row = *dataset.row(0).unwrap();
    let radar = ranges.normalize(&row);
    let scaled = outcome.scaler.transform_row(&row);

    assert!(radar.iter().all(|v| (0.0..=1.0).contains(v)));
    assert_ne!(radar, scaled);

    // predicting the slider defaults works like any other request
    let predictor = Predictor::new(outcome.scaler, outcome.model).unwrap();
    let defaults = PredictionRequest::from_values(&ranges.default_row()).unwrap();
    let result = predictor.predict(&defaults);
    assert!((result.probabilities().iter().sum::<f64>() - 1.0).abs() < 1e-12);
}

// ============================================================================
// In-Memory Frames
// ============================================================================

#[test]
fn test_fit_from_dataframe() {
    let n = 12;
    let mut columns = vec![
        Column::new("id".into(), (0..n as i64).collect::<Vec<_>>()),
        Column::new(
            "diagnosis".into(),
            (0..n)
                .map(|i| if i % 2 == 0 { "B" } else { "M" })
                .collect::<Vec<_>>(),
        ),
    ];
    for (j, name) in feature_names().iter().enumerate() {
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let base = if i % 2 == 0 { 1.0 } else { 3.0 };
                base + (i + j) as f64 / 100.0
            })
            .collect();
        columns.push(Column::new(name.as_str().into(), values));
    }
    let df = DataFrame::new(columns).unwrap();

    let (dataset, summary) = load_and_clean(df).unwrap();
    assert_eq!(summary.dropped_columns, vec!["id".to_string()]);

    let outcome = cellscope_learning::fit(&dataset, TestSize::Count(4), 1).unwrap();
    assert_eq!(outcome.report.n_test, 4);
    assert_eq!(outcome.report.accuracy, 1.0);
}
