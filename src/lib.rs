//! Churn Prediction Pipeline Library
//!
//! Turns loosely specified customer attributes into the exact feature vector
//! a previously trained churn classifier expects, and scores it.

pub mod aligner;
pub mod config;
pub mod consumer;
pub mod error;
pub mod handler;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod types;

pub use aligner::{align, align_with, dropped_columns, AlignedRecord};
pub use crate::config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::{ChurnError, ErrorKind, PipelineError, Stage};
pub use models::inference::{ChurnPipeline, FallbackPolicy, SharedPipeline};
pub use producer::ResponsePublisher;
pub use types::{
    prediction::{Label, Prediction, PredictionResponse},
    record::{FeatureRecord, FeatureValue},
};
