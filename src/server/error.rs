//! HTTP error responses

use crate::error::PipelineError;
use crate::types::RequestError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failures surfaced to HTTP clients.
///
/// Clients see two tiers: a malformed request (422) or anything else (500).
#[derive(Debug)]
pub enum ApiError {
    /// Body parsed but `data` is absent or of the wrong shape
    Request(RequestError),
    /// Body is not valid JSON
    InvalidJson(String),
    /// Feature preparation or inference failed
    Pipeline(PipelineError),
    /// The prediction task itself did not complete
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Request(_) | ApiError::InvalidJson(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Pipeline(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ApiError::Request(err) => err.to_string(),
            ApiError::InvalidJson(msg) => msg.clone(),
            ApiError::Pipeline(err) => format!("Internal Server Error: {}", err),
            ApiError::Internal(msg) => format!("Internal Server Error: {}", msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(msg) = &self {
            tracing::error!("Internal error: {}", msg);
        }

        let body = Json(json!({ "detail": self.detail() }));
        (self.status(), body).into_response()
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError::Request(err)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}
