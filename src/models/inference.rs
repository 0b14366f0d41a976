//! Fraud classifier backed by ONNX Runtime

use crate::error::{PipelineError, PipelineResult};
use crate::models::loader::{LoadedModel, OutputNames};
use crate::models::pool::SessionPool;
use crate::types::FeatureMatrix;
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use tracing::debug;

/// A trained binary classifier over prepared feature matrices.
///
/// Implementations are shared read-only across requests.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// One label per matrix row, in row order
    fn predict(&self, features: &FeatureMatrix) -> PipelineResult<Vec<i64>>;
}

/// Classifier running a pool of ONNX sessions.
///
/// A session needs exclusive access while it runs, so each call takes an
/// idle session from the pool.
pub struct OnnxClassifier {
    name: String,
    sessions: SessionPool<LoadedModel>,
    decision_threshold: f64,
}

impl OnnxClassifier {
    /// Every model must be a session over the same file
    pub fn new(models: Vec<LoadedModel>, decision_threshold: f64) -> PipelineResult<Self> {
        let name = models.first().map(|m| m.name.clone()).unwrap_or_default();
        let sessions = SessionPool::new(models)
            .ok_or_else(|| PipelineError::artifact("model", "no sessions loaded"))?;

        Ok(Self {
            name,
            sessions,
            decision_threshold,
        })
    }

    pub fn pool_size(&self) -> usize {
        self.sessions.len()
    }

    /// Read labels from the session outputs.
    ///
    /// Prefers the int64 label tensor, then probabilities as a tensor,
    /// then probabilities as `seq(map(int64, float))`.
    fn extract_labels(
        &self,
        outputs: &ort::session::SessionOutputs,
        names: &OutputNames,
        rows: usize,
    ) -> PipelineResult<Vec<i64>> {
        if let Some(output) = names.label.as_deref().and_then(|n| outputs.get(n)) {
            if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                if data.len() == rows {
                    debug!(model = %self.name, "Extracted labels from label tensor");
                    return Ok(data.to_vec());
                }
            }
        }

        if let Some(output) = names.probability.as_deref().and_then(|n| outputs.get(n)) {
            if let Some(labels) = self.labels_from_probabilities(output, rows) {
                return Ok(labels);
            }
        }

        // Fallback: any output that yields one label per row
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                    if data.len() == rows {
                        return Ok(data.to_vec());
                    }
                }
                continue;
            }
            if let Some(labels) = self.labels_from_probabilities(&output, rows) {
                debug!(model = %self.name, output = %name, "Extracted labels (fallback)");
                return Ok(labels);
            }
        }

        Err(PipelineError::InferenceFailed(format!(
            "model '{}' produced no usable label or probability output",
            self.name
        )))
    }

    fn labels_from_probabilities(&self, output: &ort::value::DynValue, rows: usize) -> Option<Vec<i64>> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            return self.labels_from_tensor(shape, data, rows);
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return self.labels_from_sequence_map(output, rows).ok();
        }

        None
    }

    fn labels_from_tensor(&self, shape: &ort::tensor::Shape, data: &[f32], rows: usize) -> Option<Vec<i64>> {
        let dims: Vec<i64> = shape.iter().copied().collect();
        labels_from_probability_tensor(&dims, data, rows, self.decision_threshold)
    }

    /// Per-row argmax over `seq(map(int64, float))`, as exported with ZipMap
    fn labels_from_sequence_map(
        &self,
        output: &ort::value::DynValue,
        rows: usize,
    ) -> PipelineResult<Vec<i64>> {
        let allocator = Allocator::default();

        let sequence = output.downcast_ref::<DynSequenceValueType>().map_err(|e| {
            PipelineError::InferenceFailed(format!("failed to downcast to sequence: {}", e))
        })?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        if maps.len() != rows {
            return Err(PipelineError::InferenceFailed(format!(
                "expected {} probability maps, got {}",
                rows,
                maps.len()
            )));
        }

        maps.iter()
            .map(|map_value| {
                let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
                Ok(argmax(kv_pairs.into_iter()))
            })
            .collect()
    }
}

/// Labels from a probability tensor of shape `dims`.
///
/// `[rows, classes]` takes the argmax, `[rows, 1]` or `[rows]` compares the
/// fraud probability against `threshold` (inclusive). Any other shape, or a
/// row count other than `rows`, yields `None`.
fn labels_from_probability_tensor(dims: &[i64], data: &[f32], rows: usize, threshold: f64) -> Option<Vec<i64>> {
    match *dims {
        [n, classes] if n as usize == rows && classes >= 2 => {
            let classes = classes as usize;
            if data.len() != rows * classes {
                return None;
            }
            Some(
                data.chunks(classes)
                    .map(|probs| argmax(probs.iter().copied().enumerate().map(|(i, p)| (i as i64, p))))
                    .collect(),
            )
        }
        [n, 1] | [n] if n as usize == rows && data.len() == rows => Some(
            data.iter()
                .map(|&p| i64::from(f64::from(p) >= threshold))
                .collect(),
        ),
        _ => None,
    }
}

/// Class with the highest probability; the lowest class wins ties
fn argmax(scores: impl Iterator<Item = (i64, f32)>) -> i64 {
    scores
        .fold(None, |best: Option<(i64, f32)>, (class, p)| match best {
            Some((_, best_p)) if best_p >= p => best,
            _ => Some((class, p)),
        })
        .map(|(class, _)| class)
        .unwrap_or(0)
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureMatrix) -> PipelineResult<Vec<i64>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let input = Tensor::from_array((features.shape(), features.as_slice().to_vec()))?;

        let mut guard = self.sessions.acquire();
        let model = &mut *guard;
        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input])?;

        let labels = self.extract_labels(&outputs, &model.outputs, features.rows())?;

        debug!(model = %self.name, rows = labels.len(), "Batch inference complete");
        Ok(labels)
    }
}
