//! Numeric scaler fitted at training time

use crate::error::{PipelineError, PipelineResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Columns the scaler was fit on
pub const SCALED_COLUMNS: [&str; 7] = [
    "amount",
    "oldbalance_org",
    "newbalance_orig",
    "oldbalance_dest",
    "newbalance_dest",
    "diff_new_old_balance",
    "diff_new_old_destiny",
];

#[derive(Debug, Deserialize)]
struct ScalerFile {
    columns: Vec<String>,
    #[serde(alias = "mean")]
    center: Vec<f64>,
    scale: Vec<f64>,
}

/// Affine scaler: `(x - center) / scale` per column
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    params: HashMap<String, (f64, f64)>,
}

impl Scaler {
    pub fn new(columns: Vec<String>, center: Vec<f64>, scale: Vec<f64>) -> PipelineResult<Self> {
        if columns.len() != center.len() || columns.len() != scale.len() {
            return Err(PipelineError::artifact(
                "scaler",
                format!(
                    "length mismatch: {} columns, {} centers, {} scales",
                    columns.len(),
                    center.len(),
                    scale.len()
                ),
            ));
        }

        let listed = columns.len();
        let mut params = HashMap::with_capacity(listed);
        for ((column, center), scale) in columns.into_iter().zip(center).zip(scale) {
            if !center.is_finite() || !scale.is_finite() {
                return Err(PipelineError::artifact(
                    "scaler",
                    format!("non-finite parameters for column '{}'", column),
                ));
            }
            // Constant features are fitted with a unit scale
            let scale = if scale == 0.0 { 1.0 } else { scale };
            params.insert(column, (center, scale));
        }
        if params.len() != listed {
            return Err(PipelineError::artifact("scaler", "column listed more than once"));
        }

        let missing: Vec<&str> = SCALED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !params.contains_key(*c))
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::artifact(
                "scaler",
                format!("not fit on column(s): {}", missing.join(", ")),
            ));
        }
        if params.len() != SCALED_COLUMNS.len() {
            return Err(PipelineError::artifact(
                "scaler",
                format!(
                    "expected exactly {} columns, found {}",
                    SCALED_COLUMNS.len(),
                    params.len()
                ),
            ));
        }

        Ok(Self { params })
    }

    /// Load a scaler exported as JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::artifact("scaler", format!("{}: {}", path.display(), e)))?;
        let file: ScalerFile = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::artifact("scaler", format!("{}: {}", path.display(), e)))?;
        Self::new(file.columns, file.center, file.scale)
    }

    /// Scale one value of `column`. NaN stays NaN.
    pub fn transform(&self, column: &str, value: f64) -> PipelineResult<f64> {
        let (center, scale) = self
            .params
            .get(column)
            .ok_or_else(|| PipelineError::Scaling(format!("column '{}' was not fit", column)))?;
        Ok((value - center) / scale)
    }

    /// Scale the seven fitted columns of one row, in `SCALED_COLUMNS` order.
    pub fn transform_row(&self, values: [f64; 7]) -> PipelineResult<[f64; 7]> {
        let mut scaled = values;
        for (value, column) in scaled.iter_mut().zip(SCALED_COLUMNS) {
            *value = self.transform(column, *value)?;
        }
        Ok(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn columns() -> Vec<String> {
        SCALED_COLUMNS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_transform_applies_center_and_scale() {
        let scaler = Scaler::new(columns(), vec![10.0; 7], vec![2.0; 7]).unwrap();
        assert_eq!(scaler.transform("amount", 14.0).unwrap(), 2.0);
        assert!(scaler.transform("amount", f64::NAN).unwrap().is_nan());
        assert!(matches!(scaler.transform("step", 1.0), Err(PipelineError::Scaling(_))));
    }

    #[test]
    fn test_zero_scale_treated_as_unit() {
        let scaler = Scaler::new(columns(), vec![1.0; 7], vec![0.0; 7]).unwrap();
        assert_eq!(scaler.transform("oldbalance_org", 5.0).unwrap(), 4.0);
    }

    #[test]
    fn test_column_order_in_file_is_irrelevant() {
        let mut cols = columns();
        cols.reverse();
        let mut center = vec![0.0; 7];
        center[0] = 100.0; // diff_new_old_destiny after reversal
        let scaler = Scaler::new(cols, center, vec![1.0; 7]).unwrap();

        let row = scaler.transform_row([100.0; 7]).unwrap();
        assert_eq!(row[6], 0.0);
        assert_eq!(row[0], 100.0);
    }

    #[test]
    fn test_rejects_incomplete_fit() {
        let result = Scaler::new(vec!["amount".to_string()], vec![0.0], vec![1.0]);
        assert!(matches!(result, Err(PipelineError::ArtifactUnavailable { .. })));

        let result = Scaler::new(columns(), vec![0.0; 6], vec![1.0; 7]);
        assert!(matches!(result, Err(PipelineError::ArtifactUnavailable { .. })));
    }

    #[test]
    fn test_rejects_duplicate_column() {
        let mut cols = columns();
        cols.push("amount".to_string());
        let result = Scaler::new(cols, vec![0.0; 8], vec![1.0; 8]);

        match result {
            Err(PipelineError::ArtifactUnavailable { artifact, reason }) => {
                assert_eq!(artifact, "scaler");
                assert!(reason.contains("more than once"));
            }
            other => panic!("duplicate column accepted: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_with_mean_alias() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let doc = serde_json::json!({
            "columns": SCALED_COLUMNS,
            "mean": [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "scale": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0],
        });
        write!(file, "{}", doc).unwrap();

        let scaler = Scaler::from_file(file.path()).unwrap();
        assert_eq!(scaler.transform("diff_new_old_destiny", 8.0).unwrap(), 1.0);
    }
}
