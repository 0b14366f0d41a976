//! Feature preparation for fraud model inference.
//!
//! Reproduces the training-time transformation exactly: normalize field
//! names, coerce numerics, derive balance differences, drop identity and
//! label fields, one-hot encode, scale, and select the model's columns in
//! the order it was fit on.

use crate::error::{PipelineError, PipelineResult};
use crate::models::encoder::OneHotEncoder;
use crate::models::scaler::Scaler;
use crate::types::prediction::{FeatureMatrix, PreparedBatch, FEATURE_COLUMNS};
use crate::types::transaction::{
    nan_or, normalize_row, CoercionReport, TransactionRecord, DROPPED_FIELDS, NUMERIC_FIELDS,
};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Indicator column the model consumes
const TRANSFER_INDICATOR: &str = "type_TRANSFER";

/// Transforms raw rows into the model's feature matrix.
///
/// Pure: the encoder and scaler are never mutated, so one instance is
/// shared by every request.
#[derive(Debug, Clone)]
pub struct FeaturePreparer {
    encoder: OneHotEncoder,
    scaler: Scaler,
    transfer_index: usize,
}

impl FeaturePreparer {
    pub fn new(encoder: OneHotEncoder, scaler: Scaler) -> PipelineResult<Self> {
        if let Some(column) = encoder
            .input_columns()
            .find(|c| NUMERIC_FIELDS.contains(c) || DROPPED_FIELDS.contains(c))
        {
            return Err(PipelineError::artifact(
                "encoder",
                format!("column '{}' is not categorical", column),
            ));
        }

        let transfer_index = encoder.output_index(TRANSFER_INDICATOR).ok_or_else(|| {
            PipelineError::artifact(
                "encoder",
                format!("fitted vocabulary does not produce '{}'", TRANSFER_INDICATOR),
            )
        })?;

        Ok(Self {
            encoder,
            scaler,
            transfer_index,
        })
    }

    /// Columns every batch must carry, after name normalization
    pub fn required_columns(&self) -> Vec<&str> {
        NUMERIC_FIELDS
            .iter()
            .copied()
            .chain(self.encoder.input_columns())
            .collect()
    }

    /// Prepare a batch of raw rows.
    ///
    /// A required column is missing only when no row carries it; rows that
    /// lack a column another row has get a missing value for it.
    pub fn prepare(&self, rows: &[Map<String, Value>]) -> PipelineResult<PreparedBatch> {
        let normalized: Vec<Map<String, Value>> = rows.iter().map(normalize_row).collect();

        if normalized.is_empty() {
            return Ok(PreparedBatch::default());
        }

        let present: HashSet<&str> = normalized
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        let missing: Vec<String> = self
            .required_columns()
            .into_iter()
            .filter(|c| !present.contains(c))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::MissingFields(missing));
        }

        let mut coercions = CoercionReport::default();
        let mut features = FeatureMatrix::with_capacity(normalized.len());

        for row in normalized {
            let record = TransactionRecord::from_normalized(row, &mut coercions);
            features.push_row(self.feature_row(&record)?);
        }

        Ok(PreparedBatch {
            features,
            coercions,
        })
    }

    /// One model input row, in `FEATURE_COLUMNS` order
    fn feature_row(&self, record: &TransactionRecord) -> PipelineResult<[f32; 7]> {
        // amount and oldbalance_dest are scaled with the rest but not selected
        let scaled = self.scaler.transform_row([
            nan_or(record.amount),
            nan_or(record.oldbalance_org),
            nan_or(record.newbalance_orig),
            nan_or(record.oldbalance_dest),
            nan_or(record.newbalance_dest),
            record.diff_new_old_balance(),
            record.diff_new_old_destiny(),
        ])?;
        let [_, oldbalance_org, newbalance_orig, _, newbalance_dest, diff_balance, diff_destiny] =
            scaled;

        let encoded = self.encoder.encode(&record.attributes);
        let transfer = encoded.get(self.transfer_index).copied().ok_or_else(|| {
            PipelineError::Encoding(format!(
                "encoded row has {} columns, '{}' expected at {}",
                encoded.len(),
                TRANSFER_INDICATOR,
                self.transfer_index
            ))
        })?;

        Ok([
            nan_or(record.step) as f32,
            oldbalance_org as f32,
            newbalance_orig as f32,
            newbalance_dest as f32,
            diff_balance as f32,
            diff_destiny as f32,
            transfer,
        ])
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COLUMNS.len()
    }

    /// Get feature names (matching training order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_COLUMNS
    }
}
