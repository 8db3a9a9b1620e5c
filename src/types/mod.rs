//! Type definitions for the churn prediction pipeline

pub mod prediction;
pub mod record;

pub use prediction::{Label, Prediction, PredictionResponse};
pub use record::{FeatureRecord, FeatureRecordBuilder, FeatureValue, FieldKind};
