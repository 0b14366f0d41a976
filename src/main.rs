//! Fraud Detection API - Main Entry Point
//!
//! Loads the trained artifacts once, then serves predictions over HTTP.

use anyhow::{Context, Result};
use fraud_detection_api::{
    config::{AppConfig, LogFormat, LoggingConfig},
    metrics::{MetricsReporter, PipelineMetrics},
    models::loader::Artifacts,
    server::{create_router, AppState},
    Classifier,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;
    info!("Starting Fraud Detection API");
    info!(
        model = %config.artifacts.model_path.display(),
        scaler = %config.artifacts.scaler_path.display(),
        encoder = %config.artifacts.encoder_path.display(),
        "Configuration loaded successfully"
    );

    // Load every artifact once; requests share them read-only
    let artifacts = Artifacts::load(&config.artifacts).context("Failed to load artifacts")?;
    info!(
        model = %artifacts.model.name(),
        features = ?artifacts.preparer.feature_names(),
        "Artifacts loaded"
    );

    let metrics = Arc::new(PipelineMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = create_router(AppState::new(artifacts, metrics.clone()));

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Fraud Detection API shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(format!(
            "fraud_detection_api={level},tower_http={level}",
            level = logging.level
        )),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
