//! Fraud Detection API Library
//!
//! Serves fraud predictions for mobile-money transactions over HTTP by
//! replaying the training-time feature pipeline and running a pre-trained
//! ONNX classifier.

pub mod config;
pub mod error;
pub mod feature_preparer;
pub mod metrics;
pub mod models;
pub mod predictor;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::{PipelineError, PipelineResult};
pub use feature_preparer::FeaturePreparer;
pub use models::inference::{Classifier, OnnxClassifier};
pub use models::loader::Artifacts;
pub use server::{create_router, AppState};
pub use types::transaction::TransactionRecord;
