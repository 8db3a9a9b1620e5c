//! Schema alignment between a feature record and the encoder's fitted columns.
//!
//! The encoder only accepts rows whose columns match the schema it was fitted
//! on, name for name and in the same order. Alignment projects a record onto
//! that schema: expected columns the record lacks are filled, columns the
//! encoder never saw are dropped.

use crate::types::record::{FeatureRecord, FeatureValue};
use tracing::debug;

/// A record projected onto an expected schema
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRecord {
    columns: Vec<String>,
    values: Vec<FeatureValue>,
}

impl AlignedRecord {
    /// Build an aligned record from parallel columns and values
    pub fn new(columns: Vec<String>, values: Vec<FeatureValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| &self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Align with the plain policy: every missing column becomes integer 0
pub fn align<S: AsRef<str>>(record: &FeatureRecord, expected_schema: &[S]) -> AlignedRecord {
    align_with(record, expected_schema, |_| FeatureValue::Int(0))
}

/// Align, taking the value for each missing column from `fill`
pub fn align_with<S, F>(record: &FeatureRecord, expected_schema: &[S], mut fill: F) -> AlignedRecord
where
    S: AsRef<str>,
    F: FnMut(&str) -> FeatureValue,
{
    let mut columns = Vec::with_capacity(expected_schema.len());
    let mut values = Vec::with_capacity(expected_schema.len());

    for name in expected_schema {
        let name = name.as_ref();
        let value = match record.get(name) {
            Some(value) => value.clone(),
            None => {
                let value = fill(name);
                debug!(column = %name, value = %value, "Filled missing column");
                value
            }
        };
        columns.push(name.to_string());
        values.push(value);
    }

    let dropped = dropped_columns(record, &columns);
    if !dropped.is_empty() {
        debug!(dropped = ?dropped, "Dropped columns outside the expected schema");
    }

    AlignedRecord { columns, values }
}

/// Record fields with no place in `expected_schema`
pub fn dropped_columns<'a, S>(record: &'a FeatureRecord, expected_schema: &[S]) -> Vec<&'a str>
where
    S: AsRef<str>,
{
    record
        .iter()
        .map(|(name, _)| name)
        .filter(|name| !expected_schema.iter().any(|c| c.as_ref() == *name))
        .collect()
}
