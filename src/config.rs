//! Configuration management for the churn prediction service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Serialized format of the classifier artifact
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierFormat {
    /// JSON random forest, scored natively
    #[default]
    Forest,
    /// ONNX model, scored through ONNX Runtime (`onnx` feature)
    Onnx,
}

/// How the aligner fills expected columns absent from a record
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingColumnPolicy {
    /// Categorical columns take the training most-frequent category, numeric columns 0
    #[default]
    TrainingMode,
    /// Every missing column is 0
    Zero,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub artifacts: ArtifactsConfig,
    pub prediction: PredictionConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject scoring requests arrive on
    pub request_subject: String,
    /// Subject for responses to requests without a reply subject
    pub response_subject: String,
    /// Queue group shared by service instances; unset means every instance sees every request
    pub queue_group: Option<String>,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            request_subject: "churn.predict".to_string(),
            response_subject: "churn.predictions".to_string(),
            queue_group: None,
        }
    }
}

/// Artifact locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory holding the artifact files
    pub dir: String,
    pub encoder_file: String,
    pub classifier_file: String,
    pub classifier_format: ClassifierFormat,
    /// Intra-op threads for the ONNX backend
    pub onnx_threads: usize,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: "artifacts".to_string(),
            encoder_file: "preprocessor.json".to_string(),
            classifier_file: "model.json".to_string(),
            classifier_format: ClassifierFormat::Forest,
            onnx_threads: 1,
        }
    }
}

/// Prediction behavior
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PredictionConfig {
    pub missing_columns: MissingColumnPolicy,
}

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum concurrently scored requests
    pub workers: usize,
    /// Seconds between metrics summaries
    pub metrics_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            metrics_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `CHURN_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("CHURN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, with `CHURN__SECTION__KEY` overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("CHURN").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.nats.request_subject, "churn.predict");
        assert_eq!(config.artifacts.classifier_format, ClassifierFormat::Forest);
        assert_eq!(
            config.prediction.missing_columns,
            MissingColumnPolicy::TrainingMode
        );
        assert_eq!(config.pipeline.workers, 4);
        assert!(config.nats.queue_group.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[artifacts]").unwrap();
        writeln!(file, "dir = \"/srv/churn\"").unwrap();
        writeln!(file, "classifier_format = \"onnx\"").unwrap();
        writeln!(file, "[prediction]").unwrap();
        writeln!(file, "missing_columns = \"zero\"").unwrap();
        writeln!(file, "[nats]").unwrap();
        writeln!(file, "queue_group = \"churn-workers\"").unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.artifacts.dir, "/srv/churn");
        assert_eq!(config.artifacts.classifier_format, ClassifierFormat::Onnx);
        assert_eq!(config.artifacts.encoder_file, "preprocessor.json");
        assert_eq!(config.prediction.missing_columns, MissingColumnPolicy::Zero);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.nats.queue_group.as_deref(), Some("churn-workers"));
        assert_eq!(config.nats.request_subject, "churn.predict");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension("absent.toml");
        assert!(AppConfig::load_from_path(path).is_err());
    }
}
