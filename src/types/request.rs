//! Prediction request body

use serde_json::{Map, Value};
use thiserror::Error;

/// Request-shape problems detected before any feature preparation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Missing 'data' key in JSON")]
    MissingData,

    #[error("'data' should be a list of dictionaries")]
    NotRecords,
}

/// Extract the rows under `data`: one object is a batch of one, an array
/// of objects keeps its order.
pub fn extract_rows(body: Value) -> Result<Vec<Map<String, Value>>, RequestError> {
    let data = match body {
        Value::Object(mut body) => body.remove("data"),
        _ => None,
    };

    match data {
        None | Some(Value::Null) => Err(RequestError::MissingData),
        Some(Value::Object(row)) => Ok(vec![row]),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                _ => Err(RequestError::NotRecords),
            })
            .collect(),
        Some(_) => Err(RequestError::NotRecords),
    }
}
