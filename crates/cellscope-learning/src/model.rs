//! Inference over persisted scaler and model parameters.
//!
//! [`Predictor`] loads both artifacts once, checks them against the feature
//! schema, and then answers requests without touching the filesystem.
//! [`SharedPredictor`] wraps one behind a lock so retrained artifacts can be
//! swapped in while other threads keep predicting.
//!
//! # Example
//!
//! ```rust,ignore
//! use cellscope_learning::{PredictionRequest, Predictor};
//!
//! let predictor = Predictor::load("model/")?;
//! let request = PredictionRequest::from_json(&serde_json::from_str(&body)?)?;
//! let result = predictor.predict(&request);
//! println!("{} ({:.1}% malignant)", result.diagnosis, result.probability_malignant * 100.0);
//! ```

use crate::artifacts::{ArtifactStore, MODEL_ARTIFACT, SCALER_ARTIFACT};
use crate::classifier::ModelParams;
use crate::error::{LearningError, Result};
use crate::scaler::ScalerParams;
use crate::types::{PredictionRequest, PredictionResult};
use cellscope_processing::FeatureRow;
use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Fitted scaler and classifier, ready for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictor {
    scaler: ScalerParams,
    model: ModelParams,
}

impl Predictor {
    /// Pair a scaler with a model after checking both against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::ArtifactSchema`] if either does not describe
    /// the thirty schema features in order.
    pub fn new(scaler: ScalerParams, model: ModelParams) -> Result<Self> {
        if let Some(reason) = scaler.schema_mismatch() {
            return Err(LearningError::artifact_schema(SCALER_ARTIFACT, reason));
        }
        if let Some(reason) = model.schema_mismatch() {
            return Err(LearningError::artifact_schema(MODEL_ARTIFACT, reason));
        }
        if scaler.feature_names != model.feature_names {
            return Err(LearningError::artifact_schema(
                MODEL_ARTIFACT,
                "model and scaler were fitted on different features",
            ));
        }
        Ok(Self { scaler, model })
    }

    /// Load the `scaler` and `model` artifacts from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::ArtifactMissing`] if either artifact is absent
    /// or undecodable, and [`LearningError::ArtifactSchema`] if they come from
    /// different fits or do not match the schema.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_store(&ArtifactStore::new(dir.as_ref()))
    }

    pub fn from_store(store: &ArtifactStore) -> Result<Self> {
        let (scaler, model) = store.load_pair()?;
        let predictor = Self::new(scaler, model)?;
        info!("Loaded predictor from {}", store.dir().display());
        Ok(predictor)
    }

    /// Persist both artifacts to `store` as one pair.
    pub fn save(&self, store: &ArtifactStore) -> Result<()> {
        store.save_pair(&self.scaler, &self.model)?;
        Ok(())
    }

    pub fn scaler(&self) -> &ScalerParams {
        &self.scaler
    }

    pub fn model(&self) -> &ModelParams {
        &self.model
    }

    /// Classify a validated request.
    pub fn predict(&self, request: &PredictionRequest) -> PredictionResult {
        self.predict_row(request.values())
    }

    /// Classify a raw row in schema order, e.g. a row of the cleaned dataset.
    pub fn predict_row(&self, row: &FeatureRow) -> PredictionResult {
        let scaled = self.scaler.transform_row(row);
        PredictionResult::from_probability(self.model.probability_malignant(&scaled))
    }

    /// Validate a JSON request and classify it.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Validation`] if the request is malformed.
    pub fn predict_json(&self, request: &Value) -> Result<PredictionResult> {
        let request = PredictionRequest::from_json(request)?;
        Ok(self.predict(&request))
    }
}

/// A predictor that can be replaced while in use.
///
/// Readers clone an `Arc` to the current predictor under a short read lock,
/// so a [`reload`](Self::reload) never leaves them with a half-loaded one.
#[derive(Debug)]
pub struct SharedPredictor {
    dir: PathBuf,
    current: RwLock<Arc<Predictor>>,
}

impl SharedPredictor {
    /// Load the artifacts in `dir` and keep the directory for reloads.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let predictor = Predictor::load(&dir)?;
        Ok(Self {
            dir,
            current: RwLock::new(Arc::new(predictor)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The predictor in use right now.
    pub fn current(&self) -> Arc<Predictor> {
        self.current.read().clone()
    }

    pub fn predict(&self, request: &PredictionRequest) -> PredictionResult {
        self.current().predict(request)
    }

    /// Re-read the artifacts. On failure the previous predictor stays active.
    pub fn reload(&self) -> Result<()> {
        match Predictor::load(&self.dir) {
            Ok(predictor) => {
                *self.current.write() = Arc::new(predictor);
                info!("Reloaded predictor from {}", self.dir.display());
                Ok(())
            }
            Err(e) => {
                warn!("Keeping previous predictor, reload failed: {}", e);
                Err(e)
            }
        }
    }
}

static_assertions::assert_impl_all!(Predictor: Send, Sync);
static_assertions::assert_impl_all!(SharedPredictor: Send, Sync);
