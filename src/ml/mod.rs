pub mod artifact;
pub mod cache;
pub mod features;
pub mod predictor;

pub use artifact::{Capabilities, Estimator, ModelArtifact, ModelHandle};
pub use cache::ModelCache;
pub use features::FeatureExtractor;
pub use predictor::Predictor;
