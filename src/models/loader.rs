//! Artifact store and artifact loading

use crate::config::{ArtifactsConfig, ClassifierFormat};
use crate::error::{ArtifactSlot, ChurnError, Result};
use crate::models::classifier::{Classifier, RandomForest};
use crate::models::encoder::FittedEncoder;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Source of serialized encoder/classifier blobs
pub trait ArtifactStore: Send + Sync {
    fn load(&self, slot: ArtifactSlot) -> Result<Vec<u8>>;
}

/// Artifacts stored as files under one directory
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
    encoder_file: String,
    classifier_file: String,
}

impl FsArtifactStore {
    pub fn new<P: AsRef<Path>>(dir: P, encoder_file: &str, classifier_file: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            encoder_file: encoder_file.to_string(),
            classifier_file: classifier_file.to_string(),
        }
    }

    pub fn from_config(config: &ArtifactsConfig) -> Self {
        Self::new(&config.dir, &config.encoder_file, &config.classifier_file)
    }

    pub fn path(&self, slot: ArtifactSlot) -> PathBuf {
        match slot {
            ArtifactSlot::Encoder => self.dir.join(&self.encoder_file),
            ArtifactSlot::Classifier => self.dir.join(&self.classifier_file),
        }
    }
}

impl ArtifactStore for FsArtifactStore {
    fn load(&self, slot: ArtifactSlot) -> Result<Vec<u8>> {
        let path = self.path(slot);
        info!(slot = %slot, path = %path.display(), "Loading artifact");

        std::fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ChurnError::ArtifactNotFound {
                slot,
                location: path.display().to_string(),
            },
            _ => ChurnError::corrupt(slot, format!("failed to read {}: {}", path.display(), e)),
        })
    }
}

/// In-memory artifact blobs
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactStore {
    blobs: HashMap<ArtifactSlot, Vec<u8>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slot: ArtifactSlot, bytes: impl Into<Vec<u8>>) -> Self {
        self.blobs.insert(slot, bytes.into());
        self
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn load(&self, slot: ArtifactSlot) -> Result<Vec<u8>> {
        self.blobs
            .get(&slot)
            .cloned()
            .ok_or_else(|| ChurnError::ArtifactNotFound {
                slot,
                location: "memory".to_string(),
            })
    }
}

/// Load and validate the encoder artifact
pub fn load_encoder(store: &dyn ArtifactStore) -> Result<FittedEncoder> {
    let bytes = store.load(ArtifactSlot::Encoder)?;
    let encoder = FittedEncoder::from_slice(&bytes)?;
    info!(
        columns = encoder.expected_schema().len(),
        output_dim = encoder.output_dim(),
        "Encoder loaded"
    );
    Ok(encoder)
}

/// Load the classifier artifact in the configured format
pub fn load_classifier(
    store: &dyn ArtifactStore,
    format: ClassifierFormat,
    onnx_threads: usize,
) -> Result<Arc<dyn Classifier>> {
    let bytes = store.load(ArtifactSlot::Classifier)?;
    match format {
        ClassifierFormat::Forest => {
            let forest = RandomForest::from_slice(&bytes)?;
            info!(
                trees = forest.num_trees(),
                n_features = forest.n_features,
                voting = ?forest.voting,
                "Random forest classifier loaded"
            );
            Ok(Arc::new(forest))
        }
        #[cfg(feature = "onnx")]
        ClassifierFormat::Onnx => Ok(Arc::new(crate::models::onnx::OnnxClassifier::from_bytes(
            &bytes,
            onnx_threads,
        )?)),
        #[cfg(not(feature = "onnx"))]
        ClassifierFormat::Onnx => {
            let _ = onnx_threads;
            Err(ChurnError::corrupt(
                ArtifactSlot::Classifier,
                "ONNX classifier requires the `onnx` feature",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_fs_store_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path(), "preprocessor.json", "model.json");

        let err = store.load(ArtifactSlot::Classifier).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactNotFound);
        assert!(err.to_string().contains("model.json"));
    }

    #[test]
    fn test_fs_store_reads_blob() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("model.json")).unwrap();
        file.write_all(b"{}").unwrap();

        let store = FsArtifactStore::new(dir.path(), "preprocessor.json", "model.json");
        assert_eq!(store.load(ArtifactSlot::Classifier).unwrap(), b"{}".to_vec());
    }

    #[test]
    fn test_corrupt_classifier() {
        let store = MemoryArtifactStore::new().with(ArtifactSlot::Classifier, "[1, 2, 3]");
        let err = load_classifier(&store, ClassifierFormat::Forest, 1)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ArtifactCorrupt);
    }

    #[test]
    fn test_memory_store_missing_slot() {
        let store = MemoryArtifactStore::new();
        let err = load_encoder(&store).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactNotFound);
    }
}
