use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeBuilder, TreeParams};
use super::{BoosterConfig, ModelError};

/// Additive tree ensemble: `base_score + Σ tree(x)`. Leaf values already
/// include the learning rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    n_features: usize,
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    pub fn fit(
        config: &BoosterConfig,
        features: &[Vec<f64>],
        labels: &[f64],
    ) -> Result<Self, ModelError> {
        config.validate()?;
        let n_features = check_matrix(features)?;
        if features.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                rows: features.len(),
                labels: labels.len(),
            });
        }
        if let Some(row) = labels.iter().position(|y| !y.is_finite()) {
            return Err(ModelError::NonFinite { what: "labels", row });
        }

        let n = labels.len();
        let base_score = labels.iter().sum::<f64>() / n as f64;
        let params = TreeParams {
            max_depth: config.max_depth,
            min_child_weight: config.min_child_weight,
            lambda: config.lambda,
            gamma: config.gamma,
            learning_rate: config.learning_rate,
        };

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut preds = vec![base_score; n];
        let mut grad = vec![0.0; n];
        let hess = vec![1.0; n];
        let mut trees = Vec::with_capacity(config.n_estimators);

        for round in 0..config.n_estimators {
            for i in 0..n {
                grad[i] = preds[i] - labels[i];
            }
            let rows = sample(n, config.subsample, &mut rng);
            let columns = sample(n_features, config.colsample_bytree, &mut rng);

            let tree = TreeBuilder::new(features, &grad, &hess, &columns, &params).build(rows);
            for (p, row) in preds.iter_mut().zip(features) {
                *p += tree.predict(row);
            }
            trees.push(tree);

            if (round + 1) % 25 == 0 {
                let rmse = (preds
                    .iter()
                    .zip(labels)
                    .map(|(p, y)| (p - y).powi(2))
                    .sum::<f64>()
                    / n as f64)
                    .sqrt();
                tracing::debug!(round = round + 1, train_rmse = rmse, "boosting progress");
            }
        }

        Ok(Self {
            n_features,
            base_score,
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn predict_row(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.n_features {
            return Err(ModelError::FeatureCountMismatch {
                row: 0,
                expected: self.n_features,
                actual: row.len(),
            });
        }
        Ok(self.base_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>())
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                self.predict_row(row).map_err(|e| match e {
                    ModelError::FeatureCountMismatch {
                        expected, actual, ..
                    } => ModelError::FeatureCountMismatch {
                        row: i,
                        expected,
                        actual,
                    },
                    other => other,
                })
            })
            .collect()
    }

    pub(crate) fn check_structure(&self) -> Result<(), String> {
        if !self.base_score.is_finite() {
            return Err("non-finite base score".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check_structure(self.n_features)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }
}

fn check_matrix(features: &[Vec<f64>]) -> Result<usize, ModelError> {
    let width = features
        .first()
        .map(Vec::len)
        .ok_or(ModelError::EmptyTrainingSet)?;
    for (row, values) in features.iter().enumerate() {
        if values.len() != width {
            return Err(ModelError::FeatureCountMismatch {
                row,
                expected: width,
                actual: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite {
                what: "features",
                row,
            });
        }
    }
    Ok(width)
}

/// Sorted index subset of size `ceil(n * ratio)`; the identity when `ratio >= 1`.
fn sample(n: usize, ratio: f64, rng: &mut StdRng) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..n).collect();
    if ratio >= 1.0 {
        return idx;
    }
    let k = ((n as f64 * ratio).ceil() as usize).clamp(1, n);
    idx.shuffle(rng);
    idx.truncate(k);
    idx.sort_unstable();
    idx
}
