//! Prepared model input and prediction output shapes

use serde_json::{Map, Value};

use super::transaction::CoercionReport;

/// Feature columns in the exact order the model was fit on
pub const FEATURE_COLUMNS: [&str; 7] = [
    "step",
    "oldbalance_org",
    "newbalance_orig",
    "newbalance_dest",
    "diff_new_old_balance",
    "diff_new_old_destiny",
    "type_TRANSFER",
];

/// Name of the field appended to every returned record
pub const PREDICTION_FIELD: &str = "prediction";

/// Row-major `[rows, FEATURE_COLUMNS.len()]` matrix of model inputs.
/// Missing values are NaN.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    pub const WIDTH: usize = FEATURE_COLUMNS.len();

    pub fn with_capacity(rows: usize) -> Self {
        Self {
            rows: 0,
            data: Vec::with_capacity(rows * Self::WIDTH),
        }
    }

    pub fn push_row(&mut self, row: [f32; FEATURE_COLUMNS.len()]) {
        self.data.extend_from_slice(&row);
        self.rows += 1;
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index * Self::WIDTH;
        self.data.get(start..start + Self::WIDTH)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Tensor shape for the model input
    pub fn shape(&self) -> Vec<i64> {
        vec![self.rows as i64, Self::WIDTH as i64]
    }
}

/// Output of feature preparation for one batch
#[derive(Debug, Clone, Default)]
pub struct PreparedBatch {
    pub features: FeatureMatrix,
    pub coercions: CoercionReport,
}

/// An input record as the client sent it, plus the predicted label
pub fn with_prediction(mut record: Map<String, Value>, label: i64) -> Value {
    record.insert(PREDICTION_FIELD.to_string(), Value::from(label));
    Value::Object(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_matrix_rows() {
        let mut matrix = FeatureMatrix::with_capacity(2);
        matrix.push_row([1.0; 7]);
        matrix.push_row([2.0; 7]);

        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.shape(), vec![2, 7]);
        assert_eq!(matrix.row(1), Some(&[2.0_f32; 7][..]));
        assert_eq!(matrix.row(2), None);
    }

    #[test]
    fn test_prediction_appended_last() {
        let record = json!({"step": 1, "type": "TRANSFER"});
        let out = with_prediction(record.as_object().unwrap().clone(), 1);
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["step", "type", "prediction"]);
        assert_eq!(out["prediction"], json!(1));
    }
}
