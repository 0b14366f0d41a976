//! Configuration management for the fraud detection API

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variables overriding configuration keys
const ENV_OVERRIDES: [(&str, &str); 8] = [
    ("ML_MODEL_PATH", "artifacts.model_path"),
    ("SCALER_PATH", "artifacts.scaler_path"),
    ("ENCODER_PATH", "artifacts.encoder_path"),
    ("SESSION_POOL", "artifacts.session_pool"),
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
];

/// Log output format
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Trained artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// ONNX classifier
    pub model_path: PathBuf,
    /// Scaler parameters (JSON)
    pub scaler_path: PathBuf,
    /// One-hot encoder vocabulary (JSON)
    pub encoder_path: PathBuf,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
    /// Concurrent ONNX sessions (default: available parallelism)
    #[serde(default = "default_session_pool")]
    pub session_pool: usize,
    /// Probability cut-off for models that only output fraud probability
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between summaries in the log; 0 disables the reporter
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_onnx_threads() -> usize {
    1
}

fn default_session_pool() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_decision_threshold() -> f64 {
    0.5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_report_interval() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: default_report_interval(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Load configuration from `.env`, the config file and the environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = std::env::var("FRAUD_API_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Load configuration from an optional file, overridden by the
    /// variables `env` resolves
    pub fn load_with_env<P, F>(path: P, env: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder().add_source(File::from(path.as_ref()).required(false));

        for (var, key) in ENV_OVERRIDES {
            builder = builder
                .set_override_option(key, env(var))
                .with_context(|| format!("Invalid override from {}", var))?;
        }

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_only_configuration() {
        let env = env_from(&[
            ("ML_MODEL_PATH", "/models/model.onnx"),
            ("SCALER_PATH", "/models/scaler.json"),
            ("ENCODER_PATH", "/models/encoder.json"),
        ]);
        let config = AppConfig::load_with_env("/nonexistent/config.toml", env).unwrap();

        assert_eq!(config.artifacts.model_path, PathBuf::from("/models/model.onnx"));
        assert_eq!(config.artifacts.onnx_threads, 1);
        assert!(config.artifacts.session_pool >= 1);
        assert_eq!(config.artifacts.decision_threshold, 0.5);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.metrics.report_interval_secs, 60);
    }

    #[test]
    fn test_missing_artifact_paths_fail() {
        let result = AppConfig::load_with_env("/nonexistent/config.toml", env_from(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[artifacts]
model_path = "file/model.onnx"
scaler_path = "file/scaler.json"
encoder_path = "file/encoder.json"
onnx_threads = 4

[logging]
format = "json"
"#
        )
        .unwrap();

        let env = env_from(&[
            ("ML_MODEL_PATH", "env/model.onnx"),
            ("PORT", "8081"),
            ("SESSION_POOL", "3"),
        ]);
        let config = AppConfig::load_with_env(file.path(), env).unwrap();

        assert_eq!(config.artifacts.model_path, PathBuf::from("env/model.onnx"));
        assert_eq!(config.artifacts.scaler_path, PathBuf::from("file/scaler.json"));
        assert_eq!(config.artifacts.onnx_threads, 4);
        assert_eq!(config.artifacts.session_pool, 3);
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
