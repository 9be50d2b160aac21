use crate::domain::model::ModelKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{entity} with {field} '{value}' already exists")]
    Conflict {
        entity: String,
        field: String,
        value: String,
    },

    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),
}

/// 推論層的錯誤分類，只在 `PredictionService` 邊界才換成預設值
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("{kind} model is not available")]
    ModelUnavailable { kind: ModelKind },

    #[error("failed to load {kind} artifact: {message}")]
    ArtifactLoad { kind: ModelKind, message: String },

    #[error("{kind} model does not support {capability}")]
    Unsupported {
        kind: ModelKind,
        capability: &'static str,
    },

    #[error("{kind} inference failed: {message}")]
    Inference { kind: ModelKind, message: String },
}

impl PredictionError {
    pub fn inference(kind: ModelKind, message: impl Into<String>) -> Self {
        Self::Inference {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Self::ModelUnavailable { kind }
            | Self::ArtifactLoad { kind, .. }
            | Self::Unsupported { kind, .. }
            | Self::Inference { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Data,
    Configuration,
    Validation,
    Prediction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RiskError::IoError(_) => ErrorCategory::Io,
            RiskError::SerializationError(_) | RiskError::CsvError(_) => ErrorCategory::Data,
            RiskError::ConfigError { .. }
            | RiskError::ConfigValidationError { .. }
            | RiskError::InvalidConfigValueError { .. }
            | RiskError::MissingConfigError { .. } => ErrorCategory::Configuration,
            RiskError::ValidationError { .. }
            | RiskError::NotFound { .. }
            | RiskError::Conflict { .. } => ErrorCategory::Validation,
            RiskError::Prediction(_) => ErrorCategory::Prediction,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 模型缺席只是降級，不算失敗
            RiskError::Prediction(PredictionError::ModelUnavailable { .. }) => ErrorSeverity::Low,
            RiskError::Prediction(_) => ErrorSeverity::Medium,
            RiskError::NotFound { .. }
            | RiskError::ValidationError { .. }
            | RiskError::Conflict { .. } => ErrorSeverity::High,
            RiskError::SerializationError(_) | RiskError::CsvError(_) => ErrorSeverity::High,
            RiskError::ConfigError { .. }
            | RiskError::ConfigValidationError { .. }
            | RiskError::InvalidConfigValueError { .. }
            | RiskError::MissingConfigError { .. }
            | RiskError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            RiskError::IoError(_) => {
                "Check that the file or directory exists and is readable".to_string()
            }
            RiskError::SerializationError(_) => {
                "Make sure the model artifact is valid JSON produced by the export tooling"
                    .to_string()
            }
            RiskError::CsvError(_) => {
                "Make sure the CSV file has a 'location,severity' header row".to_string()
            }
            RiskError::ConfigError { .. } | RiskError::ConfigValidationError { .. } => {
                "Review the TOML configuration file for syntax errors".to_string()
            }
            RiskError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in the configuration", field)
            }
            RiskError::MissingConfigError { field } => {
                format!("Add '{}' to the configuration or environment", field)
            }
            RiskError::ValidationError { .. } => "Correct the input and try again".to_string(),
            RiskError::NotFound { .. } => "Verify the identifier and try again".to_string(),
            RiskError::Conflict { field, .. } => format!("Choose a different {}", field),
            RiskError::Prediction(PredictionError::ModelUnavailable { kind }) => format!(
                "Export a {} artifact into the configured model directory",
                kind
            ),
            RiskError::Prediction(_) => {
                "Re-export the model artifact or check the feature layout".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("File access failed: {}", self),
            ErrorCategory::Data => format!("Could not read input data: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Validation => format!("Invalid request: {}", self),
            ErrorCategory::Prediction => format!("Prediction unavailable: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;
