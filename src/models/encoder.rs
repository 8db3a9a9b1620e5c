//! Fitted column encoder.
//!
//! Reproduces the training-time preprocessing: numeric columns are
//! median-imputed and standardized with the stored mean/scale, categorical
//! columns are most-frequent-imputed, one-hot encoded (unknown categories give
//! an all-zero block) and divided by the stored per-indicator scale.

use crate::aligner::AlignedRecord;
use crate::error::{ArtifactSlot, ChurnError, Result};
use crate::types::record::FeatureValue;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fitted parameters for one numeric column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    /// Training median, used for missing values
    pub median: f64,
    pub mean: f64,
    /// Training standard deviation (0 means constant column)
    pub scale: f64,
}

impl NumericColumn {
    fn encode(&self, value: &FeatureValue) -> Result<f64> {
        let raw = value.as_f64().ok_or_else(|| {
            ChurnError::validation(
                &self.name,
                format!("numeric column received category `{}`", value),
            )
        })?;
        let x = if raw.is_finite() { raw } else { self.median };
        let scale = if self.scale == 0.0 { 1.0 } else { self.scale };
        Ok((x - self.mean) / scale)
    }
}

/// Fitted parameters for one categorical column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    /// Known categories, in one-hot order
    pub categories: Vec<String>,
    /// Training most-frequent category, used for missing values
    pub most_frequent: String,
    /// Per-indicator standard deviation
    pub scale: Vec<f64>,
}

impl CategoricalColumn {
    fn width(&self) -> usize {
        self.categories.len()
    }

    fn encode_into(&self, value: &FeatureValue, out: &mut Vec<f64>) {
        let category = match value {
            FeatureValue::Float(v) if !v.is_finite() => self.most_frequent.clone(),
            other => other.to_string(),
        };
        let hot = self.categories.iter().position(|c| *c == category);

        for (idx, scale) in self.scale.iter().enumerate() {
            if Some(idx) == hot {
                out.push(if *scale == 0.0 { 1.0 } else { 1.0 / scale });
            } else {
                out.push(0.0);
            }
        }
    }
}

/// Persisted, fitted numeric + categorical transform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedEncoder {
    /// Columns the encoder was fitted on, in fit order
    pub feature_names_in: Vec<String>,
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

/// Where a schema column is encoded
#[derive(Debug, Clone, Copy)]
enum ColumnRole {
    Numeric(usize),
    Categorical(usize),
}

impl FittedEncoder {
    /// Deserialize an encoder artifact and check its internal consistency
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let encoder: FittedEncoder = serde_json::from_slice(bytes)
            .map_err(|e| ChurnError::corrupt(ArtifactSlot::Encoder, e.to_string()))?;
        encoder.validate()?;
        Ok(encoder)
    }

    fn validate(&self) -> Result<()> {
        let corrupt = |reason: String| ChurnError::corrupt(ArtifactSlot::Encoder, reason);

        if self.feature_names_in.is_empty() {
            return Err(corrupt("empty feature schema".to_string()));
        }

        let mut seen = HashSet::new();
        for name in &self.feature_names_in {
            if !seen.insert(name.as_str()) {
                return Err(corrupt(format!("duplicate schema column `{}`", name)));
            }
        }

        let mut declared = HashSet::new();
        let names = self
            .numeric
            .iter()
            .map(|c| &c.name)
            .chain(self.categorical.iter().map(|c| &c.name));
        for name in names {
            if !declared.insert(name.as_str()) {
                return Err(corrupt(format!("column `{}` declared twice", name)));
            }
            if !seen.contains(name.as_str()) {
                return Err(corrupt(format!("column `{}` is not in the schema", name)));
            }
        }
        if let Some(name) = self
            .feature_names_in
            .iter()
            .find(|n| !declared.contains(n.as_str()))
        {
            return Err(corrupt(format!("schema column `{}` has no transform", name)));
        }

        for column in &self.categorical {
            if column.categories.is_empty() {
                return Err(corrupt(format!("column `{}` has no categories", column.name)));
            }
            if column.scale.len() != column.categories.len() {
                return Err(corrupt(format!(
                    "column `{}` has {} categories but {} scales",
                    column.name,
                    column.categories.len(),
                    column.scale.len()
                )));
            }
        }

        Ok(())
    }

    /// Ordered column names the encoder requires
    pub fn expected_schema(&self) -> &[String] {
        &self.feature_names_in
    }

    /// Length of every vector produced by `transform`
    pub fn output_dim(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.width()).sum::<usize>()
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.categorical.iter().any(|c| c.name == column)
    }

    /// Training-time most-frequent category of a categorical column
    pub fn most_frequent(&self, column: &str) -> Option<&str> {
        self.categorical
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.most_frequent.as_str())
    }

    fn role(&self, column: &str) -> Option<ColumnRole> {
        self.numeric
            .iter()
            .position(|c| c.name == column)
            .map(ColumnRole::Numeric)
            .or_else(|| {
                self.categorical
                    .iter()
                    .position(|c| c.name == column)
                    .map(ColumnRole::Categorical)
            })
    }

    /// Encode an aligned record into a feature vector
    pub fn transform(&self, aligned: &AlignedRecord) -> Result<Vec<f64>> {
        if aligned.columns() != self.feature_names_in.as_slice() {
            return Err(ChurnError::SchemaMismatch {
                expected: self.feature_names_in.clone(),
                found: aligned.columns().to_vec(),
            });
        }

        let mut numeric_values = vec![0.0; self.numeric.len()];
        let mut categorical_values: Vec<Option<&FeatureValue>> = vec![None; self.categorical.len()];

        for (name, value) in aligned.iter() {
            match self.role(name) {
                Some(ColumnRole::Numeric(idx)) => {
                    numeric_values[idx] = self.numeric[idx].encode(value)?;
                }
                Some(ColumnRole::Categorical(idx)) => categorical_values[idx] = Some(value),
                None => {
                    return Err(ChurnError::corrupt(
                        ArtifactSlot::Encoder,
                        format!("schema column `{}` has no transform", name),
                    ))
                }
            }
        }

        let mut vector = Vec::with_capacity(self.output_dim());
        vector.extend_from_slice(&numeric_values);
        for (column, value) in self.categorical.iter().zip(categorical_values) {
            let fallback = FeatureValue::Category(column.most_frequent.clone());
            column.encode_into(value.unwrap_or(&fallback), &mut vector);
        }

        debug_assert_eq!(vector.len(), self.output_dim());
        Ok(vector)
    }
}
