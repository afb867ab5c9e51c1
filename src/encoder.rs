//! Record → feature vector transformation with a fitted categorical vocabulary.
//!
//! Output layout: one indicator column per vocabulary value of each
//! categorical field (sorted), then every numeric field in
//! [`NumericField::ALL`] order, passed through unscaled. Values outside the
//! fitted vocabulary leave their indicator block all zero.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, TrainingDataError};
use crate::schema::{CategoricalField, FeatureSchema, NumericField};
use crate::types::{InferenceRecord, TrainingRecord};

/// Sorted distinct values seen for one categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub field: String,
    pub values: Vec<String>,
}

impl Vocabulary {
    fn position(&self, value: &str) -> Option<usize> {
        self.values
            .binary_search_by(|v| v.as_str().cmp(value))
            .ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    schema: FeatureSchema,
    vocabularies: Vec<Vocabulary>,
}

impl FeatureEncoder {
    /// Fits the vocabulary from training rows. Call with the train split only.
    pub fn fit(records: &[TrainingRecord]) -> Result<Self, TrainingDataError> {
        if records.is_empty() {
            return Err(TrainingDataError::Empty);
        }

        let vocabularies = CategoricalField::ALL
            .iter()
            .map(|&field| {
                let values: BTreeSet<&str> = records
                    .iter()
                    .map(|r| field.value(&r.features))
                    .collect();
                Vocabulary {
                    field: field.name().to_string(),
                    values: values.into_iter().map(str::to_owned).collect(),
                }
            })
            .collect::<Vec<_>>();

        for v in &vocabularies {
            tracing::debug!(field = %v.field, size = v.values.len(), "fitted vocabulary");
        }

        Ok(Self {
            schema: FeatureSchema::current(),
            vocabularies,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn vocabularies(&self) -> &[Vocabulary] {
        &self.vocabularies
    }

    /// Width of every vector `transform` produces.
    pub fn dimension(&self) -> usize {
        self.vocabularies
            .iter()
            .map(|v| v.values.len())
            .sum::<usize>()
            + NumericField::ALL.len()
    }

    /// Column names in output order, e.g. `weather=clear`, `distance_km`.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.dimension());
        for vocab in &self.vocabularies {
            for value in &vocab.values {
                names.push(format!("{}={}", vocab.field, value));
            }
        }
        names.extend(NumericField::ALL.iter().map(|f| f.name().to_string()));
        names
    }

    pub fn transform(&self, record: &InferenceRecord) -> Result<Vec<f64>, SchemaError> {
        record.validate()?;

        let mut out = Vec::with_capacity(self.dimension());
        for (field, vocab) in CategoricalField::ALL.iter().zip(&self.vocabularies) {
            let start = out.len();
            out.resize(start + vocab.values.len(), 0.0);
            if let Some(pos) = vocab.position(field.value(record)) {
                out[start + pos] = 1.0;
            }
        }
        out.extend(NumericField::ALL.iter().map(|f| f.value(record)));
        Ok(out)
    }

    pub fn transform_batch<'a, I>(&self, records: I) -> Result<Vec<Vec<f64>>, SchemaError>
    where
        I: IntoIterator<Item = &'a InferenceRecord>,
    {
        records.into_iter().map(|r| self.transform(r)).collect()
    }

    /// Checks that a deserialized encoder matches the layout of this build.
    pub(crate) fn check_consistency(&self) -> Result<(), String> {
        if let Some(diff) = self.schema.diff_against_current() {
            return Err(diff);
        }
        if self.vocabularies.len() != CategoricalField::ALL.len() {
            return Err(format!(
                "{} vocabularies for {} categorical fields",
                self.vocabularies.len(),
                CategoricalField::ALL.len()
            ));
        }
        for (field, vocab) in CategoricalField::ALL.iter().zip(&self.vocabularies) {
            if vocab.field != field.name() {
                return Err(format!(
                    "vocabulary for '{}' where '{}' expected",
                    vocab.field,
                    field.name()
                ));
            }
            if vocab.values.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!("vocabulary for '{}' is not sorted", vocab.field));
            }
        }
        Ok(())
    }
}
