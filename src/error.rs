//! Error types for the churn prediction pipeline

use std::fmt;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, ChurnError>;

/// Named artifact slots in the artifact store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactSlot {
    Encoder,
    Classifier,
}

impl fmt::Display for ArtifactSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactSlot::Encoder => f.write_str("encoder"),
            ArtifactSlot::Classifier => f.write_str("classifier"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChurnError {
    #[error("invalid field `{field}`: {reason}")]
    Validation { field: String, reason: String },

    #[error("{slot} artifact not found at {location}")]
    ArtifactNotFound { slot: ArtifactSlot, location: String },

    #[error("{slot} artifact is corrupt: {reason}")]
    ArtifactCorrupt { slot: ArtifactSlot, reason: String },

    #[error("schema mismatch: encoder expects {expected:?}, got {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("dimension mismatch: classifier expects {expected} features, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("inference backend failed: {0}")]
    Inference(String),
}

impl ChurnError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ChurnError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupt(slot: ArtifactSlot, reason: impl Into<String>) -> Self {
        ChurnError::ArtifactCorrupt {
            slot,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChurnError::Validation { .. } => ErrorKind::Validation,
            ChurnError::ArtifactNotFound { .. } => ErrorKind::ArtifactNotFound,
            ChurnError::ArtifactCorrupt { .. } => ErrorKind::ArtifactCorrupt,
            ChurnError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            ChurnError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            ChurnError::Inference(_) => ErrorKind::Inference,
        }
    }
}

/// Flat tag for an error, used for metrics and log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    ArtifactNotFound,
    ArtifactCorrupt,
    SchemaMismatch,
    DimensionMismatch,
    Inference,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ArtifactNotFound => "artifact_not_found",
            ErrorKind::ArtifactCorrupt => "artifact_corrupt",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::DimensionMismatch => "dimension_mismatch",
            ErrorKind::Inference => "inference",
        }
    }
}

/// Pipeline step an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadArtifacts,
    Encode,
    Classify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadArtifacts => "load_artifacts",
            Stage::Encode => "encode",
            Stage::Classify => "classify",
        };
        f.write_str(name)
    }
}

/// A `ChurnError` tagged with the pipeline stage that raised it
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: ChurnError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: ChurnError) -> Self {
        Self { stage, source }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_message_names_stage() {
        let err = PipelineError::new(
            Stage::Classify,
            ChurnError::DimensionMismatch {
                expected: 53,
                found: 52,
            },
        );

        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
        let msg = err.to_string();
        assert!(msg.starts_with("classify failed"));
        assert!(msg.contains("expects 53 features, got 52"));
    }

    #[test]
    fn test_artifact_not_found_message() {
        let err = ChurnError::ArtifactNotFound {
            slot: ArtifactSlot::Classifier,
            location: "artifacts/model.json".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "classifier artifact not found at artifacts/model.json"
        );
        assert_eq!(err.kind().as_str(), "artifact_not_found");
    }
}
