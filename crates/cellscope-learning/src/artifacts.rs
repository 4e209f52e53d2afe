//! Durable storage for fitted parameters.
//!
//! Each artifact is a single file `<dir>/<name>.bin` holding a bincode-encoded
//! envelope:
//!
//! ```text
//! format     "cellscope-artifact"
//! version    1
//! kind       "scaler" | "model"
//! fit_id     16 hex digits, shared by the scaler and model of one fit
//! created_at UTC timestamp
//! payload    ScalerParams | ModelParams
//! ```
//!
//! Writes go to `<name>.bin.tmp`, are synced, then renamed over the target,
//! so a concurrent reader sees either the old file or the new one.
//! [`ArtifactStore::save_pair`] stages both files before renaming either, and
//! [`ArtifactStore::load_pair`] refuses a scaler and model whose fit ids
//! differ, so a half-replaced pair is never served.
//!
//! An artifact that is absent, undecodable, of the wrong kind or of an
//! unknown version is reported as [`LearningError::ArtifactMissing`].

use crate::classifier::ModelParams;
use crate::error::{LearningError, Result};
use crate::scaler::ScalerParams;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ARTIFACT_FORMAT: &str = "cellscope-artifact";
pub const ARTIFACT_VERSION: u32 = 1;
pub const SCALER_ARTIFACT: &str = "scaler";
pub const MODEL_ARTIFACT: &str = "model";

const EXTENSION: &str = "bin";

/// A value that can be stored under a fixed artifact name.
pub trait Artifact: Serialize + DeserializeOwned {
    /// Artifact name, also the file stem and the envelope `kind`.
    const KIND: &'static str;
}

impl Artifact for ScalerParams {
    const KIND: &'static str = SCALER_ARTIFACT;
}

impl Artifact for ModelParams {
    const KIND: &'static str = MODEL_ARTIFACT;
}

/// Everything in front of the payload. Decoded first so a foreign or stale
/// file is rejected before its payload is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub format: String,
    pub version: u32,
    pub kind: String,
    /// Identifies the fit that produced the artifact.
    pub fit_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct ArtifactEnvelope<T> {
    header: ArtifactHeader,
    payload: T,
}

/// Directory holding the named artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path of the artifact called `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Encode and atomically write a single artifact under a fresh fit id,
    /// replacing any previous one.
    ///
    /// The result no longer pairs with the other artifact in the directory;
    /// use [`save_pair`](Self::save_pair) for fitted parameters.
    pub fn save<T: Artifact>(&self, value: &T) -> Result<PathBuf> {
        let bytes = encode(value, &new_fit_id(), Utc::now())?;
        self.save_bytes(T::KIND, &bytes)
    }

    /// Write a scaler and model from the same fit, sharing one fit id.
    ///
    /// Both files are staged and synced before either is renamed into place,
    /// so a failed write leaves the previous pair untouched.
    pub fn save_pair(&self, scaler: &ScalerParams, model: &ModelParams) -> Result<String> {
        let fit_id = new_fit_id();
        let created_at = Utc::now();
        let scaler_bytes = encode(scaler, &fit_id, created_at)?;
        let model_bytes = encode(model, &fit_id, created_at)?;

        fs::create_dir_all(&self.dir)?;
        let scaler_tmp = self.stage(SCALER_ARTIFACT, &scaler_bytes)?;
        let model_tmp = match self.stage(MODEL_ARTIFACT, &model_bytes) {
            Ok(path) => path,
            Err(e) => {
                let _ = fs::remove_file(&scaler_tmp);
                return Err(e);
            }
        };

        fs::rename(&scaler_tmp, self.path_for(SCALER_ARTIFACT))?;
        fs::rename(&model_tmp, self.path_for(MODEL_ARTIFACT))?;
        info!(
            "Saved scaler and model (fit {}) to {}",
            fit_id,
            self.dir.display()
        );
        Ok(fit_id)
    }

    /// Read and decode an artifact.
    pub fn load<T: Artifact>(&self) -> Result<T> {
        self.load_with_header().map(|(_, value)| value)
    }

    /// Read and decode an artifact together with its header.
    pub fn load_with_header<T: Artifact>(&self) -> Result<(ArtifactHeader, T)> {
        let bytes = self.load_bytes(T::KIND)?;
        let header = decode_header(T::KIND, &bytes)?;
        debug!(
            "Decoding artifact '{}' from fit {} written at {}",
            header.kind, header.fit_id, header.created_at
        );

        let envelope: ArtifactEnvelope<T> = bincode::deserialize(&bytes)
            .map_err(|e| LearningError::artifact_missing(T::KIND, format!("cannot decode: {e}")))?;
        Ok((header, envelope.payload))
    }

    /// Read the scaler and model and check that they come from one fit.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::ArtifactMissing`] if either is absent or
    /// undecodable, and [`LearningError::ArtifactSchema`] if their fit ids
    /// differ.
    pub fn load_pair(&self) -> Result<(ScalerParams, ModelParams)> {
        let (scaler_header, scaler) = self.load_with_header::<ScalerParams>()?;
        let (model_header, model) = self.load_with_header::<ModelParams>()?;

        if scaler_header.fit_id != model_header.fit_id {
            return Err(LearningError::artifact_schema(
                MODEL_ARTIFACT,
                format!(
                    "model (fit {}) and scaler (fit {}) come from different fits",
                    model_header.fit_id, scaler_header.fit_id
                ),
            ));
        }
        Ok((scaler, model))
    }

    /// Header of a stored artifact, without decoding its payload.
    pub fn header(&self, name: &str) -> Result<ArtifactHeader> {
        let bytes = self.load_bytes(name)?;
        decode_header(name, &bytes)
    }

    /// Write raw bytes under `name` via a synced temporary file and a rename.
    pub fn save_bytes(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let tmp = self.stage(name, bytes)?;
        let target = self.path_for(name);
        fs::rename(&tmp, &target)?;
        info!("Saved artifact '{}' to {}", name, target.display());
        Ok(target)
    }

    /// Raw bytes stored under `name`.
    pub fn load_bytes(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name);
        fs::read(&path).map_err(|e| {
            LearningError::artifact_missing(name, format!("{}: {e}", path.display()))
        })
    }

    /// Write `<name>.bin.tmp` and sync it to disk.
    fn stage(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let tmp = self.dir.join(format!("{name}.{EXTENSION}.tmp"));
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(tmp)
    }
}

fn new_fit_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

fn encode<T: Artifact>(value: &T, fit_id: &str, created_at: DateTime<Utc>) -> Result<Vec<u8>> {
    let envelope = ArtifactEnvelope {
        header: ArtifactHeader {
            format: ARTIFACT_FORMAT.to_string(),
            version: ARTIFACT_VERSION,
            kind: T::KIND.to_string(),
            fit_id: fit_id.to_string(),
            created_at,
        },
        payload: value,
    };
    bincode::serialize(&envelope).map_err(|e| {
        LearningError::Io(std::io::Error::other(format!(
            "failed to encode artifact '{}': {e}",
            T::KIND
        )))
    })
}

fn decode_header(name: &str, bytes: &[u8]) -> Result<ArtifactHeader> {
    // bincode 1.x tolerates trailing bytes, so the header decodes from the full envelope
    let header: ArtifactHeader = bincode::deserialize(bytes)
        .map_err(|e| LearningError::artifact_missing(name, format!("cannot decode header: {e}")))?;

    if header.format != ARTIFACT_FORMAT {
        return Err(LearningError::artifact_missing(
            name,
            format!("not a {ARTIFACT_FORMAT} file"),
        ));
    }
    if header.version != ARTIFACT_VERSION {
        return Err(LearningError::artifact_missing(
            name,
            format!(
                "unsupported version {} (expected {ARTIFACT_VERSION})",
                header.version
            ),
        ));
    }
    if header.kind != name {
        return Err(LearningError::artifact_missing(
            name,
            format!("file holds a '{}' artifact", header.kind),
        ));
    }
    Ok(header)
}
