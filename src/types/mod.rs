//! Type definitions for the fraud detection API

pub mod prediction;
pub mod request;
pub mod transaction;

pub use prediction::{FeatureMatrix, PreparedBatch, FEATURE_COLUMNS};
pub use request::{extract_rows, RequestError};
pub use transaction::{CoercionReport, TransactionRecord};
