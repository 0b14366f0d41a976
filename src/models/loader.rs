//! Artifact loading: ONNX model, encoder and scaler

use crate::config::ArtifactsConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::feature_preparer::FeaturePreparer;
use crate::models::encoder::OneHotEncoder;
use crate::models::inference::{Classifier, OnnxClassifier};
use crate::models::scaler::Scaler;
use anyhow::Context;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::info;

/// Output names discovered on a loaded model
#[derive(Debug, Clone, Default)]
pub struct OutputNames {
    /// int64 predicted-class output
    pub label: Option<String>,
    /// Class probability output
    pub probability: Option<String>,
}

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    pub outputs: OutputNames,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> PipelineResult<Self> {
        init_runtime().map_err(|e| PipelineError::artifact("model", format!("{:#}", e)))?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> PipelineResult<LoadedModel> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = self
            .build_session(path)
            .map_err(|e| PipelineError::artifact("model", format!("{:#}", e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        if session.outputs.is_empty() {
            return Err(PipelineError::artifact("model", "model declares no outputs"));
        }

        info!(
            model = %name,
            input = %input_name,
            label_output = ?label,
            probability_output = ?probability,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            input_name,
            outputs: OutputNames { label, probability },
        })
    }

    /// Load `size` independent sessions over the same model file
    pub fn load_pool<P: AsRef<Path>>(&self, path: P, name: &str, size: usize) -> PipelineResult<Vec<LoadedModel>> {
        let path = path.as_ref();
        (0..size.max(1)).map(|_| self.load_model(path, name)).collect()
    }

    fn build_session(&self, path: &Path) -> anyhow::Result<Session> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;
        Ok(session)
    }
}

fn init_runtime() -> anyhow::Result<()> {
    ort::init().commit()?;
    Ok(())
}

/// Everything a request needs, loaded once at startup and never mutated
pub struct Artifacts {
    pub preparer: FeaturePreparer,
    pub model: Box<dyn Classifier>,
}

impl Artifacts {
    pub fn new(preparer: FeaturePreparer, model: Box<dyn Classifier>) -> Self {
        Self { preparer, model }
    }

    /// Load encoder, scaler and model from the configured paths
    pub fn load(config: &ArtifactsConfig) -> PipelineResult<Self> {
        let encoder = OneHotEncoder::from_file(&config.encoder_path)?;
        info!(
            path = %config.encoder_path.display(),
            columns = encoder.output_columns().len(),
            "Encoder loaded"
        );

        let scaler = Scaler::from_file(&config.scaler_path)?;
        info!(path = %config.scaler_path.display(), "Scaler loaded");

        let preparer = FeaturePreparer::new(encoder, scaler)?;

        let loader = ModelLoader::with_threads(config.onnx_threads)?;
        let name = config
            .model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        let sessions = loader.load_pool(&config.model_path, &name, config.session_pool)?;
        let model = OnnxClassifier::new(sessions, config.decision_threshold)?;
        info!(model = %name, sessions = model.pool_size(), "Session pool ready");

        Ok(Self::new(preparer, Box::new(model)))
    }
}
