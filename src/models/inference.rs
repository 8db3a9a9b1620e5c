//! Inference pipeline: schema alignment, encoding and classification

use crate::aligner::{align_with, AlignedRecord};
use crate::config::{AppConfig, ClassifierFormat, MissingColumnPolicy};
use crate::error::{ChurnError, PipelineError, Stage};
use crate::models::classifier::Classifier;
use crate::models::encoder::FittedEncoder;
use crate::models::loader::{load_classifier, load_encoder, ArtifactStore};
use crate::types::prediction::{Label, Prediction};
use crate::types::record::{FeatureRecord, FeatureValue};
use rand::Rng;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info, warn};

/// What to do when a risk score cannot be computed
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FallbackPolicy {
    /// Report the error
    #[default]
    Disabled,
    /// Substitute a uniformly random integer score in `[min, max)`
    Random { min: u32, max: u32 },
}

/// Loaded encoder and classifier, immutable after construction
pub struct ChurnPipeline {
    encoder: Arc<FittedEncoder>,
    classifier: Arc<dyn Classifier>,
    missing_columns: MissingColumnPolicy,
}

impl ChurnPipeline {
    /// Assemble a pipeline from already loaded artifacts
    pub fn new(
        encoder: FittedEncoder,
        classifier: Arc<dyn Classifier>,
        missing_columns: MissingColumnPolicy,
    ) -> Result<Self, PipelineError> {
        if encoder.output_dim() != classifier.n_features() {
            return Err(PipelineError::new(
                Stage::LoadArtifacts,
                ChurnError::DimensionMismatch {
                    expected: classifier.n_features(),
                    found: encoder.output_dim(),
                },
            ));
        }

        Ok(Self {
            encoder: Arc::new(encoder),
            classifier,
            missing_columns,
        })
    }

    /// Load both artifacts from a store
    pub fn from_store(
        store: &dyn ArtifactStore,
        format: ClassifierFormat,
        onnx_threads: usize,
        missing_columns: MissingColumnPolicy,
    ) -> Result<Self, PipelineError> {
        let load = |e| PipelineError::new(Stage::LoadArtifacts, e);

        let encoder = load_encoder(store).map_err(load)?;
        let classifier = load_classifier(store, format, onnx_threads).map_err(load)?;
        let pipeline = Self::new(encoder, classifier, missing_columns)?;

        info!(
            columns = pipeline.expected_schema().len(),
            features = pipeline.classifier.n_features(),
            missing_columns = ?missing_columns,
            "Churn pipeline ready"
        );
        Ok(pipeline)
    }

    /// Load both artifacts using the artifact and prediction sections of `config`
    pub fn from_config(
        store: &dyn ArtifactStore,
        config: &AppConfig,
    ) -> Result<Self, PipelineError> {
        Self::from_store(
            store,
            config.artifacts.classifier_format,
            config.artifacts.onnx_threads,
            config.prediction.missing_columns,
        )
    }

    /// Columns the encoder was fitted on
    pub fn expected_schema(&self) -> &[String] {
        self.encoder.expected_schema()
    }

    pub fn encoder(&self) -> &FittedEncoder {
        &self.encoder
    }

    /// Project a record onto the encoder schema using the configured fill policy
    pub fn align(&self, record: &FeatureRecord) -> AlignedRecord {
        let encoder = &self.encoder;
        let policy = self.missing_columns;
        align_with(record, encoder.expected_schema(), |column| match policy {
            MissingColumnPolicy::TrainingMode => match encoder.most_frequent(column) {
                Some(category) => FeatureValue::Category(category.to_string()),
                None => FeatureValue::Int(0),
            },
            MissingColumnPolicy::Zero => FeatureValue::Int(0),
        })
    }

    /// Score one record, returning label and churn probability
    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, PipelineError> {
        let aligned = self.align(record);

        let vector = self
            .encoder
            .transform(&aligned)
            .map_err(|e| PipelineError::new(Stage::Encode, e))?;

        let churn_probability = self
            .classifier
            .predict_proba(&vector)
            .map_err(|e| PipelineError::new(Stage::Classify, e))?;
        let label = Label::from_probability(churn_probability);

        debug!(
            label = label.as_u8(),
            churn_probability = churn_probability,
            "Record scored"
        );

        Ok(Prediction {
            label,
            churn_probability,
        })
    }

    /// Score one record, returning only the label
    pub fn predict_one(&self, record: &FeatureRecord) -> Result<Label, PipelineError> {
        self.predict(record).map(|p| p.label)
    }

    /// Risk score (0-100) for a record, applying `fallback` on failure
    pub fn risk_score(
        &self,
        record: &FeatureRecord,
        fallback: &FallbackPolicy,
    ) -> Result<f64, PipelineError> {
        match self.predict(record) {
            Ok(prediction) => Ok(prediction.risk_score()),
            Err(e) => apply_fallback(e, fallback),
        }
    }
}

fn apply_fallback(error: PipelineError, fallback: &FallbackPolicy) -> Result<f64, PipelineError> {
    match *fallback {
        FallbackPolicy::Disabled => Err(error),
        FallbackPolicy::Random { min, max } if min < max => {
            let score = rand::thread_rng().gen_range(min..max);
            warn!(
                stage = %error.stage,
                kind = error.kind().as_str(),
                error = %error,
                score = score,
                "Scoring failed, substituting random risk score"
            );
            Ok(score as f64)
        }
        FallbackPolicy::Random { min, max } => {
            warn!(min = min, max = max, "Random fallback range is empty, reporting error");
            Err(error)
        }
    }
}

type Loader = Box<dyn Fn() -> Result<ChurnPipeline, PipelineError> + Send + Sync>;

/// Lazily loaded, process-wide pipeline.
///
/// The first successful load is kept for the life of the value; concurrent
/// first callers wait on the init lock so artifacts load at most once. A
/// failed load is returned to its caller and not cached.
pub struct SharedPipeline {
    loader: Loader,
    pipeline: OnceLock<Arc<ChurnPipeline>>,
    init_lock: Mutex<()>,
}

impl SharedPipeline {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<ChurnPipeline, PipelineError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            pipeline: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Shared pipeline over an artifact store, configured from `config`
    pub fn from_config<S>(store: S, config: &AppConfig) -> Self
    where
        S: ArtifactStore + 'static,
    {
        let config = config.clone();
        Self::new(move || ChurnPipeline::from_config(&store, &config))
    }

    /// The loaded pipeline, loading it on first use
    pub fn get(&self) -> Result<Arc<ChurnPipeline>, PipelineError> {
        if let Some(pipeline) = self.pipeline.get() {
            return Ok(pipeline.clone());
        }

        // a poisoned lock leaves no partial state behind
        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pipeline) = self.pipeline.get() {
            return Ok(pipeline.clone());
        }

        let pipeline = Arc::new((self.loader)()?);
        Ok(self.pipeline.get_or_init(|| pipeline).clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.pipeline.get().is_some()
    }

    pub fn predict_one(&self, record: &FeatureRecord) -> Result<Label, PipelineError> {
        self.get()?.predict_one(record)
    }

    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, PipelineError> {
        self.get()?.predict(record)
    }

    pub fn risk_score(
        &self,
        record: &FeatureRecord,
        fallback: &FallbackPolicy,
    ) -> Result<f64, PipelineError> {
        match self.get() {
            Ok(pipeline) => pipeline.risk_score(record, fallback),
            Err(e) => apply_fallback(e, fallback),
        }
    }
}
