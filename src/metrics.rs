use serde::{Deserialize, Serialize};

/// Held-out regression metrics. Reported, not used as a gate unless the
/// trainer is configured with a minimum R².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    pub samples: usize,
}

impl EvaluationReport {
    /// `truth` and `predicted` must be non-empty and of equal length.
    pub fn compute(truth: &[f64], predicted: &[f64]) -> Self {
        debug_assert_eq!(truth.len(), predicted.len());
        debug_assert!(!truth.is_empty());
        Self {
            mae: mean_absolute_error(truth, predicted),
            rmse: root_mean_squared_error(truth, predicted),
            r2: r2_score(truth, predicted),
            samples: truth.len(),
        }
    }
}

pub fn mean_absolute_error(truth: &[f64], predicted: &[f64]) -> f64 {
    truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / truth.len() as f64
}

pub fn root_mean_squared_error(truth: &[f64], predicted: &[f64]) -> f64 {
    (truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / truth.len() as f64)
        .sqrt()
}

/// Coefficient of determination. A constant target scores 1.0 when predicted
/// exactly and 0.0 otherwise.
pub fn r2_score(truth: &[f64], predicted: &[f64]) -> f64 {
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_res: f64 = truth.iter().zip(predicted).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
