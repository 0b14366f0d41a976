//! Applies the classifier and merges labels back onto the caller's rows

use crate::error::{PipelineError, PipelineResult};
use crate::models::inference::Classifier;
use crate::types::prediction::{with_prediction, FeatureMatrix};
use serde_json::{Map, Value};
use tracing::debug;

/// Predict one label per prepared row and append it to the matching
/// original row. Output order is input order.
pub fn predict(
    model: &dyn Classifier,
    original_rows: Vec<Map<String, Value>>,
    prepared: &FeatureMatrix,
) -> PipelineResult<Vec<Value>> {
    if original_rows.len() != prepared.rows() {
        return Err(PipelineError::RowCountMismatch {
            original: original_rows.len(),
            prepared: prepared.rows(),
        });
    }

    if original_rows.is_empty() {
        return Ok(Vec::new());
    }

    let labels = model.predict(prepared)?;
    if labels.len() != original_rows.len() {
        return Err(PipelineError::InferenceFailed(format!(
            "model '{}' returned {} predictions for {} rows",
            model.name(),
            labels.len(),
            original_rows.len()
        )));
    }

    debug!(
        model = %model.name(),
        rows = labels.len(),
        flagged = labels.iter().filter(|&&l| l != 0).count(),
        "Predictions merged"
    );

    Ok(original_rows
        .into_iter()
        .zip(labels)
        .map(|(row, label)| with_prediction(row, label))
        .collect())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Flags transfers that empty the origin account
    pub struct DrainRuleClassifier;

    impl Classifier for DrainRuleClassifier {
        fn name(&self) -> &str {
            "drain_rule"
        }

        fn predict(&self, features: &FeatureMatrix) -> PipelineResult<Vec<i64>> {
            Ok((0..features.rows())
                .filter_map(|i| features.row(i))
                .map(|row| {
                    let emptied = row[2] == 0.0 && row[1] > 0.0;
                    i64::from(row[6] == 1.0 && emptied)
                })
                .collect())
        }
    }

    /// Fails every call, as a broken session would
    pub struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict(&self, _features: &FeatureMatrix) -> PipelineResult<Vec<i64>> {
            Err(PipelineError::InferenceFailed("session run failed".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use serde_json::json;

    struct ShortClassifier;

    impl Classifier for ShortClassifier {
        fn name(&self) -> &str {
            "short"
        }

        fn predict(&self, _features: &FeatureMatrix) -> PipelineResult<Vec<i64>> {
            Ok(vec![0])
        }
    }

    fn originals(n: usize) -> Vec<Map<String, Value>> {
        (0..n)
            .map(|i| json!({"id": i, "type": "TRANSFER"}).as_object().unwrap().clone())
            .collect()
    }

    fn matrix(rows: &[[f32; 7]]) -> FeatureMatrix {
        let mut m = FeatureMatrix::with_capacity(rows.len());
        for row in rows {
            m.push_row(*row);
        }
        m
    }

    #[test]
    fn test_predictions_follow_row_order() {
        let prepared = matrix(&[
            [1.0, 100.0, 0.0, 100.0, -100.0, 100.0, 1.0],
            [1.0, 100.0, 50.0, 50.0, -50.0, 50.0, 1.0],
            [1.0, 100.0, 0.0, 100.0, -100.0, 100.0, 0.0],
        ]);

        let out = predict(&DrainRuleClassifier, originals(3), &prepared).unwrap();

        assert_eq!(out.len(), 3);
        let ids: Vec<_> = out.iter().map(|r| r["id"].clone()).collect();
        let labels: Vec<_> = out.iter().map(|r| r["prediction"].clone()).collect();
        assert_eq!(ids, vec![json!(0), json!(1), json!(2)]);
        assert_eq!(labels, vec![json!(1), json!(0), json!(0)]);
    }

    #[test]
    fn test_row_count_mismatch() {
        let prepared = matrix(&[[0.0; 7]]);
        let result = predict(&DrainRuleClassifier, originals(2), &prepared);
        assert!(matches!(
            result,
            Err(PipelineError::RowCountMismatch { original: 2, prepared: 1 })
        ));
    }

    #[test]
    fn test_model_failure_propagates() {
        let prepared = matrix(&[[0.0; 7]]);
        let result = predict(&FailingClassifier, originals(1), &prepared);
        assert!(matches!(result, Err(PipelineError::InferenceFailed(_))));
    }

    #[test]
    fn test_short_model_output_is_inference_failure() {
        let prepared = matrix(&[[0.0; 7], [0.0; 7]]);
        let result = predict(&ShortClassifier, originals(2), &prepared);
        assert!(matches!(result, Err(PipelineError::InferenceFailed(_))));
    }

    #[test]
    fn test_empty_batch_skips_model() {
        let result = predict(&FailingClassifier, Vec::new(), &FeatureMatrix::default());
        assert!(result.unwrap().is_empty());
    }
}
