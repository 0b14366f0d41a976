//! Error taxonomy for the feature pipeline and model inference

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failures raised while preparing features or running the model.
///
/// Every variant is reported to HTTP clients as a generic server error;
/// [`PipelineError::kind`] keeps the distinction visible in logs and metrics.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required columns absent from every row of the batch
    #[error("missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// Artifact could not be read or failed validation
    #[error("artifact unavailable ({artifact}): {reason}")]
    ArtifactUnavailable {
        artifact: &'static str,
        reason: String,
    },

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("scaling failed: {0}")]
    Scaling(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("row count mismatch: {original} original rows, {prepared} prepared rows")]
    RowCountMismatch { original: usize, prepared: usize },
}

impl PipelineError {
    /// Stable short name used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingFields(_) => "missing_fields",
            PipelineError::ArtifactUnavailable { .. } => "artifact_unavailable",
            PipelineError::Encoding(_) => "encoding",
            PipelineError::Scaling(_) => "scaling",
            PipelineError::InferenceFailed(_) => "inference_failed",
            PipelineError::RowCountMismatch { .. } => "row_count_mismatch",
        }
    }

    pub(crate) fn artifact(artifact: &'static str, reason: impl ToString) -> Self {
        PipelineError::ArtifactUnavailable {
            artifact,
            reason: reason.to_string(),
        }
    }
}

impl From<ort::Error> for PipelineError {
    fn from(err: ort::Error) -> Self {
        PipelineError::InferenceFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_all_columns() {
        let err = PipelineError::MissingFields(vec!["step".into(), "amount".into()]);
        assert_eq!(err.to_string(), "missing required field(s): step, amount");
        assert_eq!(err.kind(), "missing_fields");
    }

    #[test]
    fn test_row_count_mismatch_message() {
        let err = PipelineError::RowCountMismatch {
            original: 3,
            prepared: 2,
        };
        assert!(err.to_string().contains("3 original rows"));
    }

    #[test]
    fn test_every_kind_is_distinct() {
        let errors = [
            PipelineError::MissingFields(vec![]),
            PipelineError::artifact("model", "unreadable"),
            PipelineError::Encoding(String::new()),
            PipelineError::Scaling(String::new()),
            PipelineError::InferenceFailed(String::new()),
            PipelineError::RowCountMismatch {
                original: 1,
                prepared: 0,
            },
        ];
        let kinds: std::collections::HashSet<&str> = errors.iter().map(PipelineError::kind).collect();
        assert_eq!(kinds.len(), errors.len());
    }
}
