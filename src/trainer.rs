//! Offline training run: load → derive → split → fit → evaluate → save.
//!
//! The encoder only ever sees the train partition. Metrics are computed on
//! the held-out partition and logged; they block saving only when
//! `min_r2` is configured.

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use crate::dataset::{self, SplitIndices};
use crate::encoder::FeatureEncoder;
use crate::error::{PredictError, TrainError};
use crate::gbdt::{BoosterConfig, GradientBoostedRegressor};
use crate::metrics::EvaluationReport;
use crate::pipeline::{ArtifactMetadata, EtaPipeline, PipelineArtifact, ARTIFACT_FORMAT_VERSION};
use crate::types::TrainingRecord;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub data_path: PathBuf,
    pub output_path: PathBuf,
    /// Drives both the split and the booster's sampling.
    pub seed: u64,
    pub test_fraction: f64,
    pub booster: BoosterConfig,
    pub min_r2: Option<f64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/smarteta_dataset.csv"),
            output_path: PathBuf::from("model/eta_pipeline.json"),
            seed: DEFAULT_SEED,
            test_fraction: DEFAULT_TEST_FRACTION,
            booster: BoosterConfig::default(),
            min_r2: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub split: SplitIndices,
    pub metrics: EvaluationReport,
    pub artifact_path: Option<PathBuf>,
}

pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Full run against the configured files. Any failure aborts without
    /// touching the output path.
    pub fn run(&self) -> Result<TrainingReport, TrainError> {
        let records = dataset::load_csv(&self.config.data_path)?;
        let (artifact, mut report) = self.fit(&records)?;

        if let Some(min_r2) = self.config.min_r2 {
            if report.metrics.r2 < min_r2 {
                tracing::warn!(r2 = report.metrics.r2, min_r2, "quality gate failed");
                return Err(TrainError::QualityGate {
                    r2: report.metrics.r2,
                    min_r2,
                });
            }
        }

        artifact.save(&self.config.output_path)?;
        report.artifact_path = Some(self.config.output_path.clone());
        Ok(report)
    }

    /// Split, fit and evaluate in memory.
    pub fn fit(
        &self,
        records: &[TrainingRecord],
    ) -> Result<(PipelineArtifact, TrainingReport), TrainError> {
        let split = SplitIndices::new(records.len(), self.config.test_fraction, self.config.seed)?;
        let train: Vec<TrainingRecord> = SplitIndices::select(&split.train, records)
            .into_iter()
            .cloned()
            .collect();
        let test = SplitIndices::select(&split.test, records);
        tracing::info!(
            train = train.len(),
            test = test.len(),
            seed = self.config.seed,
            "split training data"
        );

        let encoder = FeatureEncoder::fit(&train)?;
        let x_train = encoder
            .transform_batch(train.iter().map(|r| &r.features))
            .map_err(PredictError::from)?;
        let y_train: Vec<f64> = train.iter().map(|r| r.delivery_time_min).collect();

        let booster = BoosterConfig {
            seed: self.config.seed,
            ..self.config.booster.clone()
        };
        let model = GradientBoostedRegressor::fit(&booster, &x_train, &y_train)?;
        tracing::info!(
            trees = model.n_trees(),
            features = model.n_features(),
            "model fitted"
        );

        let pipeline = EtaPipeline::new(encoder, model);
        let test_features: Vec<_> = test.iter().map(|r| r.features.clone()).collect();
        let y_test: Vec<f64> = test.iter().map(|r| r.delivery_time_min).collect();
        let y_pred = pipeline.predict_batch(&test_features)?;
        let metrics = EvaluationReport::compute(&y_test, &y_pred);
        tracing::info!(
            mae = metrics.mae,
            rmse = metrics.rmse,
            r2 = metrics.r2,
            "held-out evaluation"
        );

        let metadata = ArtifactMetadata {
            format_version: ARTIFACT_FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now(),
            seed: self.config.seed,
            rows_train: split.train.len(),
            rows_test: split.test.len(),
            metrics,
            feature_names: pipeline.encoder().feature_names(),
        };

        Ok((
            PipelineArtifact { metadata, pipeline },
            TrainingReport {
                split,
                metrics,
                artifact_path: None,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InferenceRecord;

    fn records(n: usize) -> Vec<TrainingRecord> {
        (0..n)
            .map(|i| {
                let distance_km = 1.0 + (i % 15) as f64;
                let weather = ["clear", "rainy", "foggy"][i % 3];
                let rain = if weather == "rainy" { 8.0 } else { 0.0 };
                TrainingRecord {
                    features: InferenceRecord {
                        distance_km,
                        order_items: 1 + (i % 4) as i64,
                        weather: weather.to_string(),
                        traffic: (i % 3) as i64,
                        rider_queue: (i % 5) as i64,
                        prep_time_min: 5 + (i % 10) as i64,
                        order_hour: (i % 24) as i64,
                    },
                    delivery_time_min: 10.0 + 3.0 * distance_km + rain,
                }
            })
            .collect()
    }

    #[test]
    fn encoder_sees_only_train_split() {
        let mut data = records(60);
        let trainer = Trainer::new(TrainerConfig::default());
        let split = SplitIndices::new(data.len(), 0.2, DEFAULT_SEED).unwrap();
        // a category that only exists in the held-out partition
        data[split.test[0]].features.weather = "hail".into();

        let (artifact, report) = trainer.fit(&data).unwrap();
        assert_eq!(report.split, split);
        let vocab = &artifact.pipeline.encoder().vocabularies()[0].values;
        assert!(!vocab.contains(&"hail".to_string()));
        assert!(report.metrics.mae.is_finite());
    }

    #[test]
    fn fit_is_reproducible() {
        let data = records(80);
        let trainer = Trainer::new(TrainerConfig::default());
        let (a, ra) = trainer.fit(&data).unwrap();
        let (b, rb) = trainer.fit(&data).unwrap();
        assert_eq!(ra.split, rb.split);
        assert_eq!(a.pipeline, b.pipeline);
        assert!((ra.metrics.mae - rb.metrics.mae).abs() < 1e-9);
    }

    #[test]
    fn too_few_rows_fails() {
        let trainer = Trainer::new(TrainerConfig::default());
        assert!(matches!(
            trainer.fit(&records(1)),
            Err(TrainError::Data(_))
        ));
    }
}
