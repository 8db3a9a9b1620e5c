//! Fitted artifacts and the inference pipeline

pub mod classifier;
pub mod encoder;
pub mod inference;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use classifier::{Classifier, DecisionTree, RandomForest, Voting};
pub use encoder::FittedEncoder;
pub use inference::{ChurnPipeline, FallbackPolicy, SharedPipeline};
pub use loader::{ArtifactStore, FsArtifactStore, MemoryArtifactStore};
