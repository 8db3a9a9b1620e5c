//! ONNX Runtime classifier backend

use crate::error::{ArtifactSlot, ChurnError, Result};
use crate::models::classifier::Classifier;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::sync::Mutex;
use tracing::{debug, info};

/// Classifier exported to ONNX, run through an ONNX Runtime session
pub struct OnnxClassifier {
    /// Session runs need exclusive access
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    n_features: usize,
}

impl OnnxClassifier {
    /// Build a session from in-memory model bytes
    pub fn from_bytes(bytes: &[u8], threads: usize) -> Result<Self> {
        let corrupt = |e: ort::Error| ChurnError::corrupt(ArtifactSlot::Classifier, e.to_string());

        ort::init().commit().map_err(corrupt)?;

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(threads))
            .and_then(|b| b.commit_from_memory(bytes))
            .map_err(corrupt)?;

        let input = session.inputs.first().ok_or_else(|| {
            ChurnError::corrupt(ArtifactSlot::Classifier, "model declares no inputs")
        })?;
        let input_name = input.name.clone();
        let n_features = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.last().copied())
            .filter(|&dim| dim > 0)
            .map(|dim| dim as usize)
            .ok_or_else(|| {
                ChurnError::corrupt(
                    ArtifactSlot::Classifier,
                    "model input has no fixed feature dimension",
                )
            })?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| {
                ChurnError::corrupt(ArtifactSlot::Classifier, "model declares no outputs")
            })?;

        info!(
            input = %input_name,
            output = %output_name,
            n_features = n_features,
            threads = threads,
            "ONNX classifier loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            n_features,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        self.check_dimension(features)?;
        let inference = |e: ort::Error| ChurnError::Inference(e.to_string());

        // shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let data: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let input = Tensor::from_array((shape, data)).map_err(inference)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ChurnError::Inference(format!("lock error: {}", e)))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(inference)?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            ChurnError::Inference(format!("missing output `{}`", self.output_name))
        })?;
        let (shape, data) = output.try_extract_tensor::<f32>().map_err(inference)?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        let prob = match dims.last() {
            Some(&classes) if classes >= 2 => data[1] as f64,
            Some(&1) => data[0] as f64,
            _ => {
                return Err(ChurnError::Inference(format!(
                    "unexpected probability shape {:?}",
                    dims
                )))
            }
        };

        debug!(prob = prob, "ONNX inference complete");
        Ok(prob)
    }
}
