//! Gradient-boosted regression trees.
//!
//! Squared-error boosting with second-order leaf weights and L2 leaf
//! regularisation. Feature values are compared raw, so unscaled columns with
//! very different ranges need no preprocessing.
//!
//! # Determinism
//!
//! - Split search scans features in index order and rows in a stable sort
//!   order; ties keep the first candidate found.
//! - Row/column subsampling draws from a `StdRng` seeded from
//!   [`BoosterConfig::seed`]. At the default ratios of 1.0 no randomness is
//!   consumed at all.

mod model;
mod tree;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use model::GradientBoostedRegressor;
pub use tree::{Node, RegressionTree};

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("cannot fit on an empty feature matrix")]
    EmptyTrainingSet,

    #[error("feature matrix has {rows} rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("row {row} has {actual} features, expected {expected}")]
    FeatureCountMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("non-finite value in {what} at row {row}")]
    NonFinite { what: &'static str, row: usize },

    #[error("invalid booster parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Training parameters. Defaults: 100 rounds, depth 5, learning rate 0.1, seed 42.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 penalty on leaf weights.
    pub lambda: f64,
    /// Minimum loss reduction required to split.
    pub gamma: f64,
    pub min_child_weight: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub seed: u64,
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 5,
            learning_rate: 0.1,
            lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            seed: 42,
        }
    }
}

impl BoosterConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |name, reason: &str| ModelError::InvalidParameter {
            name,
            reason: reason.to_string(),
        };
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", "must be at least 1"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid("learning_rate", "must be positive"));
        }
        if !(self.lambda >= 0.0) {
            return Err(invalid("lambda", "must be non-negative"));
        }
        if !(self.gamma >= 0.0) {
            return Err(invalid("gamma", "must be non-negative"));
        }
        if !(self.min_child_weight >= 0.0) {
            return Err(invalid("min_child_weight", "must be non-negative"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(invalid("subsample", "must be in (0, 1]"));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return Err(invalid("colsample_bytree", "must be in (0, 1]"));
        }
        Ok(())
    }
}
