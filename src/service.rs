//! Predictor service: the loaded artifact behind a narrow, injectable trait.
//!
//! Built once at process start and shared read-only (`Arc`) across request
//! handlers. Picking up a new artifact requires a restart.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{ArtifactLoadError, PredictError};
use crate::pipeline::{EtaPipeline, PipelineArtifact};
use crate::types::InferenceRecord;

/// What the HTTP layer needs from a predictor. Implemented by [`EtaService`]
/// and by test doubles.
pub trait EtaPredictor: Send + Sync {
    fn predict(&self, record: &InferenceRecord) -> Result<f64, PredictError>;

    /// Encoded feature vector, for diagnostics.
    fn encode(&self, record: &InferenceRecord) -> Result<Vec<f64>, PredictError>;

    fn info(&self) -> ModelInfo;
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelInfo {
    pub artifact_path: Option<PathBuf>,
    pub trained_at: Option<DateTime<Utc>>,
    pub feature_names: Vec<String>,
}

pub struct EtaService {
    artifact: PipelineArtifact,
    path: PathBuf,
}

impl EtaService {
    /// Loads and validates the artifact, then runs one warm-up prediction so a
    /// broken model fails here instead of on the first request.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactLoadError> {
        let path = path.as_ref().to_path_buf();
        let artifact = PipelineArtifact::load(&path)?;
        let service = Self { artifact, path };
        service.warmup()?;
        Ok(service)
    }

    pub fn pipeline(&self) -> &EtaPipeline {
        &self.artifact.pipeline
    }

    pub fn artifact(&self) -> &PipelineArtifact {
        &self.artifact
    }

    fn warmup(&self) -> Result<(), ArtifactLoadError> {
        let probe = InferenceRecord {
            distance_km: 1.0,
            order_items: 1,
            weather: String::new(),
            traffic: 0,
            rider_queue: 0,
            prep_time_min: 0,
            order_hour: 12,
        };
        let eta = self
            .pipeline()
            .predict(&probe)
            .map_err(|e| ArtifactLoadError::Inconsistent {
                reason: format!("warm-up prediction failed: {e}"),
            })?;
        if !eta.is_finite() {
            return Err(ArtifactLoadError::Inconsistent {
                reason: format!("warm-up prediction is not finite: {eta}"),
            });
        }
        tracing::info!(eta, "warmup prediction ok");
        Ok(())
    }
}

impl EtaPredictor for EtaService {
    fn predict(&self, record: &InferenceRecord) -> Result<f64, PredictError> {
        self.pipeline().predict(record)
    }

    fn encode(&self, record: &InferenceRecord) -> Result<Vec<f64>, PredictError> {
        Ok(self.pipeline().encoder().transform(record)?)
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            artifact_path: Some(self.path.clone()),
            trained_at: Some(self.artifact.metadata.trained_at),
            feature_names: self.artifact.metadata.feature_names.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonexistent_artifact_fails_before_serving() {
        let err = EtaService::load("/nonexistent/eta_pipeline.json")
            .err()
            .expect("load must fail");
        assert!(matches!(err, ArtifactLoadError::NotFound { .. }));
    }

    #[test]
    fn service_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EtaService>();
        assert_send_sync::<std::sync::Arc<dyn EtaPredictor>>();
    }
}
