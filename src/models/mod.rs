//! Trained artifacts: encoder, scaler and classifier

pub mod encoder;
pub mod inference;
pub mod loader;
pub mod pool;
pub mod scaler;

pub use encoder::OneHotEncoder;
pub use inference::{Classifier, OnnxClassifier};
pub use loader::{Artifacts, ModelLoader};
pub use pool::SessionPool;
pub use scaler::Scaler;
