//! HTTP surface: routes, shared state, CORS

pub mod error;
pub mod handlers;

use crate::metrics::PipelineMetrics;
use crate::models::loader::Artifacts;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{ApiError, ApiResult};

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub artifacts: Arc<Artifacts>,
    pub metrics: Arc<PipelineMetrics>,
}

impl AppState {
    pub fn new(artifacts: Artifacts, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
            metrics,
        }
    }
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
