//! HTTP handlers

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::error::PipelineResult;
use crate::models::loader::Artifacts;
use crate::predictor;
use crate::types::prediction::PREDICTION_FIELD;
use crate::types::{extract_rows, CoercionReport};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::Instant;
use tracing::{debug, error, warn, Span};

pub const WELCOME_MESSAGE: &str = "Welcome to the Fraud Detection API v1.0.0 by NordGuard";

pub async fn root() -> Json<Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

#[tracing::instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Vec<Value>>> {
    let start = Instant::now();
    state.metrics.record_request();

    let rows = match payload {
        Ok(Json(body)) => extract_rows(body).map_err(ApiError::from),
        Err(rejection) => Err(ApiError::InvalidJson(rejection.body_text())),
    };
    let rows = rows.map_err(|e| {
        state.metrics.record_client_error();
        warn!(detail = %e.detail(), "Rejected prediction request");
        e
    })?;

    let artifacts = state.artifacts.clone();
    let span = Span::current();
    let outcome = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        score(&artifacts, rows)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("prediction task failed: {}", e)))?;

    match outcome {
        Ok((records, coercions)) => {
            state.metrics.record_coercions(&coercions);
            let labels: Vec<i64> = records
                .iter()
                .filter_map(|r| r.get(PREDICTION_FIELD).and_then(Value::as_i64))
                .collect();
            state.metrics.record_batch(start.elapsed(), &labels);

            debug!(
                rows = records.len(),
                elapsed_us = start.elapsed().as_micros() as u64,
                "Prediction request served"
            );
            Ok(Json(records))
        }
        Err(err) => {
            state.metrics.record_pipeline_error(err.kind());
            error!(kind = err.kind(), error = %err, "Prediction failed");
            Err(ApiError::from(err))
        }
    }
}

/// Prepare features, run the model, merge labels onto the caller's rows
fn score(
    artifacts: &Artifacts,
    rows: Vec<Map<String, Value>>,
) -> PipelineResult<(Vec<Value>, CoercionReport)> {
    let prepared = artifacts.preparer.prepare(&rows)?;

    if !prepared.coercions.is_empty() {
        let fields: Vec<String> = prepared
            .coercions
            .iter()
            .map(|(field, count)| format!("{}={}", field, count))
            .collect();
        warn!(
            coerced = prepared.coercions.total(),
            fields = %fields.join(","),
            "Non-numeric values coerced to missing"
        );
    }

    let records = predictor::predict(artifacts.model.as_ref(), rows, &prepared.features)?;
    Ok((records, prepared.coercions))
}
