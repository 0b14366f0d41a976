//! One-hot encoder fitted at training time

use crate::error::{PipelineError, PipelineResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

/// One categorical column and its fitted vocabulary
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CategoricalColumn {
    pub name: String,
    pub categories: Vec<String>,
}

/// Pre-fit one-hot encoder.
///
/// Output columns are `<name>_<category>` in vocabulary order. The fitted
/// vocabulary alone decides the output; unseen and missing values encode
/// to an all-zero indicator block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OneHotEncoder {
    columns: Vec<CategoricalColumn>,
}

impl OneHotEncoder {
    pub fn new(columns: Vec<CategoricalColumn>) -> PipelineResult<Self> {
        let encoder = Self { columns };
        encoder.validate()?;
        Ok(encoder)
    }

    /// Load an encoder exported as JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::artifact("encoder", format!("{}: {}", path.display(), e)))?;
        let encoder: Self = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::artifact("encoder", format!("{}: {}", path.display(), e)))?;
        encoder.validate()?;
        Ok(encoder)
    }

    fn validate(&self) -> PipelineResult<()> {
        if self.columns.is_empty() {
            return Err(PipelineError::artifact("encoder", "no categorical columns"));
        }
        for column in &self.columns {
            let mut seen = std::collections::HashSet::new();
            if let Some(dup) = column.categories.iter().find(|c| !seen.insert(c.as_str())) {
                return Err(PipelineError::artifact(
                    "encoder",
                    format!("duplicate category '{}' in column '{}'", dup, column.name),
                ));
            }
        }
        Ok(())
    }

    /// Source columns the encoder reads
    pub fn input_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Indicator column names, in output order
    pub fn output_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|c| c.categories.iter().map(move |cat| format!("{}_{}", c.name, cat)))
            .collect()
    }

    /// Position of an indicator column in the encoded output
    pub fn output_index(&self, column: &str) -> Option<usize> {
        self.output_columns().iter().position(|c| c == column)
    }

    /// Encode one row into the full indicator vector.
    pub fn encode(&self, row: &Map<String, Value>) -> Vec<f32> {
        let width = self.columns.iter().map(|c| c.categories.len()).sum();
        let mut encoded = vec![0.0; width];
        let mut offset = 0;

        for column in &self.columns {
            if let Some(value) = row.get(&column.name).and_then(category_label) {
                if let Some(i) = column.categories.iter().position(|c| *c == value) {
                    encoded[offset + i] = 1.0;
                }
            }
            offset += column.categories.len();
        }

        encoded
    }
}

fn category_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn paysim_encoder() -> OneHotEncoder {
        OneHotEncoder::new(vec![CategoricalColumn {
            name: "type".to_string(),
            categories: ["CASH_OUT", "PAYMENT", "CASH_IN", "TRANSFER", "DEBIT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }])
        .unwrap()
    }

    fn row(value: Value) -> Map<String, Value> {
        json!({ "type": value }).as_object().unwrap().clone()
    }

    #[test]
    fn test_output_columns_follow_vocabulary() {
        let encoder = paysim_encoder();
        assert_eq!(
            encoder.output_columns(),
            vec!["type_CASH_OUT", "type_PAYMENT", "type_CASH_IN", "type_TRANSFER", "type_DEBIT"]
        );
        assert_eq!(encoder.output_index("type_TRANSFER"), Some(3));
        assert_eq!(encoder.output_index("type_OTHER"), None);
    }

    #[test]
    fn test_known_category() {
        let encoded = paysim_encoder().encode(&row(json!("TRANSFER")));
        assert_eq!(encoded, vec![0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unseen_and_missing_values_encode_to_zero() {
        let encoder = paysim_encoder();
        assert_eq!(encoder.encode(&row(json!("CRYPTO"))), vec![0.0; 5]);
        assert_eq!(encoder.encode(&row(json!(null))), vec![0.0; 5]);
        assert_eq!(encoder.encode(&Map::new()), vec![0.0; 5]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"columns": [{{"name": "type", "categories": ["TRANSFER", "PAYMENT"]}}]}}"#
        )
        .unwrap();

        let encoder = OneHotEncoder::from_file(file.path()).unwrap();
        assert_eq!(encoder.output_columns(), vec!["type_TRANSFER", "type_PAYMENT"]);
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let result = OneHotEncoder::new(vec![CategoricalColumn {
            name: "type".to_string(),
            categories: vec!["A".to_string(), "A".to_string()],
        }]);
        assert!(matches!(result, Err(PipelineError::ArtifactUnavailable { .. })));
    }

    #[test]
    fn test_unreadable_file() {
        let result = OneHotEncoder::from_file("/nonexistent/encoder.json");
        assert!(matches!(result, Err(PipelineError::ArtifactUnavailable { artifact: "encoder", .. })));
    }
}
