//! The bound (encoder, model) pair and its on-disk artifact.
//!
//! An artifact is written once by the trainer and read-only afterwards.
//! Saving goes through a sibling temp file and a rename, so readers see either
//! the previous file or the complete new one.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::encoder::FeatureEncoder;
use crate::error::{ArtifactLoadError, PredictError, TrainError};
use crate::gbdt::GradientBoostedRegressor;
use crate::metrics::EvaluationReport;
use crate::types::InferenceRecord;

/// Bumped whenever the serialized layout changes. No cross-version reads.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtaPipeline {
    encoder: FeatureEncoder,
    model: GradientBoostedRegressor,
}

impl EtaPipeline {
    pub fn new(encoder: FeatureEncoder, model: GradientBoostedRegressor) -> Self {
        Self { encoder, model }
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn model(&self) -> &GradientBoostedRegressor {
        &self.model
    }

    /// Full-precision ETA in minutes.
    pub fn predict(&self, record: &InferenceRecord) -> Result<f64, PredictError> {
        let features = self.encoder.transform(record)?;
        Ok(self.model.predict_row(&features)?)
    }

    pub fn predict_batch(&self, records: &[InferenceRecord]) -> Result<Vec<f64>, PredictError> {
        let matrix = self.encoder.transform_batch(records)?;
        Ok(self.model.predict(&matrix)?)
    }

    fn check_consistency(&self) -> Result<(), String> {
        self.encoder.check_consistency()?;
        if self.encoder.dimension() != self.model.n_features() {
            return Err(format!(
                "encoder produces {} features but model expects {}",
                self.encoder.dimension(),
                self.model.n_features()
            ));
        }
        self.model.check_structure()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub format_version: u32,
    pub crate_version: String,
    pub trained_at: DateTime<Utc>,
    pub seed: u64,
    pub rows_train: usize,
    pub rows_test: usize,
    pub metrics: EvaluationReport,
    pub feature_names: Vec<String>,
}

/// File-level unit: metadata plus the pipeline itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub metadata: ArtifactMetadata,
    pub pipeline: EtaPipeline,
}

impl PipelineArtifact {
    pub fn save(&self, path: &Path) -> Result<(), TrainError> {
        let write_err = |source| TrainError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let body = serde_json::to_vec(self)?;

        let tmp = tmp_path(path);
        fs::write(&tmp, body).map_err(write_err)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(e));
        }
        tracing::info!(path = %path.display(), "artifact saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactLoadError> {
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ArtifactLoadError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ArtifactLoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        // Check the version before committing to the full layout.
        #[derive(Deserialize)]
        struct Probe {
            metadata: ProbeMetadata,
        }
        #[derive(Deserialize)]
        struct ProbeMetadata {
            format_version: u32,
        }
        let corrupt = |source| ArtifactLoadError::Corrupt {
            path: path.to_path_buf(),
            source,
        };
        let probe: Probe = serde_json::from_slice(&bytes).map_err(corrupt)?;
        if probe.metadata.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactLoadError::UnsupportedVersion {
                found: probe.metadata.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }

        let artifact: Self = serde_json::from_slice(&bytes).map_err(corrupt)?;
        artifact
            .pipeline
            .check_consistency()
            .map_err(|reason| ArtifactLoadError::Inconsistent { reason })?;
        if artifact.metadata.feature_names != artifact.pipeline.encoder.feature_names() {
            return Err(ArtifactLoadError::Inconsistent {
                reason: "metadata feature names disagree with encoder".into(),
            });
        }

        tracing::info!(
            path = %path.display(),
            trained_at = %artifact.metadata.trained_at,
            features = artifact.pipeline.model.n_features(),
            trees = artifact.pipeline.model.n_trees(),
            "artifact loaded"
        );
        Ok(artifact)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".tmp-{}", std::process::id()));
    path.with_file_name(name)
}
