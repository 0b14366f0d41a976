//! Transaction records as decoded from the request body
//!
//! Incoming rows are loosely shaped JSON objects. Field names are normalized
//! to snake case, the six numeric fields are coerced leniently, and the
//! identity/label fields are dropped before anything reaches the model.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Raw numeric fields, after name normalization
pub const NUMERIC_FIELDS: [&str; 6] = [
    "step",
    "amount",
    "oldbalance_org",
    "newbalance_orig",
    "oldbalance_dest",
    "newbalance_dest",
];

/// Identity and label fields removed before encoding (absence is fine)
pub const DROPPED_FIELDS: [&str; 4] = ["is_fraud", "is_flagged_fraud", "name_orig", "name_dest"];

static UPPER_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").expect("valid regex"));
static LOWER_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z\d])([A-Z])").expect("valid regex"));

/// Convert a field name of arbitrary style to snake case.
///
/// `oldbalanceOrg` -> `oldbalance_org`, `isFlaggedFraud` -> `is_flagged_fraud`,
/// `HTTPCode` -> `http_code`, `new-balance` -> `new_balance`.
pub fn normalize_field_name(name: &str) -> String {
    let name = UPPER_RUN.replace_all(name, "${1}_${2}");
    let name = LOWER_UPPER.replace_all(&name, "${1}_${2}");
    name.replace('-', "_").to_lowercase()
}

/// Normalize every key of a row. Later keys win on collision.
pub fn normalize_row(row: &Map<String, Value>) -> Map<String, Value> {
    row.iter()
        .map(|(key, value)| (normalize_field_name(key), value.clone()))
        .collect()
}

/// Outcome of coercing one JSON value to a number
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coercion {
    Number(f64),
    /// Null or absent
    Missing,
    /// Present but not numeric; treated as missing
    Invalid,
}

/// Lenient numeric coercion: numbers pass, numeric strings parse,
/// booleans become 1/0, everything else is missing.
pub fn coerce_numeric(value: Option<&Value>) -> Coercion {
    let parsed = match value {
        None | Some(Value::Null) => return Coercion::Missing,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(Value::Array(_)) | Some(Value::Object(_)) => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Coercion::Number(v),
        _ => Coercion::Invalid,
    }
}

/// Per-field count of values that were present but not numeric
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionReport {
    counts: BTreeMap<&'static str, usize>,
}

impl CoercionReport {
    pub fn record(&mut self, field: &'static str) {
        *self.counts.entry(field).or_insert(0) += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn get(&self, field: &str) -> usize {
        self.counts.get(field).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.counts.iter().map(|(field, count)| (*field, *count))
    }
}

/// A transaction row after normalization and coercion.
///
/// Numeric fields are `None` when absent or not coercible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionRecord {
    pub step: Option<f64>,
    pub amount: Option<f64>,
    pub oldbalance_org: Option<f64>,
    pub newbalance_orig: Option<f64>,
    pub oldbalance_dest: Option<f64>,
    pub newbalance_dest: Option<f64>,
    /// Remaining non-numeric fields (categoricals), identity/label fields removed
    pub attributes: Map<String, Value>,
}

impl TransactionRecord {
    /// Build a record from an already normalized row, counting coercions.
    pub fn from_normalized(mut row: Map<String, Value>, report: &mut CoercionReport) -> Self {
        let mut numeric = [None; NUMERIC_FIELDS.len()];

        for (slot, field) in numeric.iter_mut().zip(NUMERIC_FIELDS) {
            match coerce_numeric(row.get(field)) {
                Coercion::Number(v) => *slot = Some(v),
                Coercion::Missing => {}
                Coercion::Invalid => report.record(field),
            }
            row.remove(field);
        }

        for field in DROPPED_FIELDS {
            row.remove(field);
        }

        let [step, amount, oldbalance_org, newbalance_orig, oldbalance_dest, newbalance_dest] =
            numeric;

        Self {
            step,
            amount,
            oldbalance_org,
            newbalance_orig,
            oldbalance_dest,
            newbalance_dest,
            attributes: row,
        }
    }

    /// `newbalance_orig - oldbalance_org`, NaN when either side is missing
    pub fn diff_new_old_balance(&self) -> f64 {
        nan_or(self.newbalance_orig) - nan_or(self.oldbalance_org)
    }

    /// `newbalance_dest - oldbalance_dest`, NaN when either side is missing
    pub fn diff_new_old_destiny(&self) -> f64 {
        nan_or(self.newbalance_dest) - nan_or(self.oldbalance_dest)
    }
}

pub(crate) fn nan_or(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}
