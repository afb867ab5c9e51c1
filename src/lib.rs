//! Delivery ETA prediction: feature encoding, a gradient-boosted regression
//! model, the offline trainer that binds them into one artifact, and the
//! HTTP predictor service that serves it.

pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod gbdt;
pub mod metrics;
pub mod pipeline;
pub mod routing;
pub mod schema;
pub mod server;
pub mod service;
pub mod trainer;
pub mod types;

pub use encoder::FeatureEncoder;
pub use error::{
    ArtifactLoadError, PredictError, RouteUnavailableError, SchemaError, TrainError,
    TrainingDataError,
};
pub use pipeline::{EtaPipeline, PipelineArtifact};
pub use service::{EtaPredictor, EtaService};
pub use trainer::{Trainer, TrainerConfig};
pub use types::{InferenceRecord, TrainingRecord};
