pub mod adapters;
pub mod config;
pub mod domain;
pub mod ml;
pub mod services;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{InMemoryAccidentRepository, InMemoryUserRepository, LocalArtifactStore};
pub use config::TomlConfig;
pub use domain::model::{FeatureVector, ModelKind, Severity, TrendForecast, User};
pub use domain::ports::PasswordHasher;
pub use ml::{FeatureExtractor, ModelCache, ModelHandle, Predictor};
pub use services::{AccidentService, PredictionService, UserService};
pub use utils::error::{PredictionError, Result, RiskError};
