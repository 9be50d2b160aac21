use crate::domain::ports::ModelSettings;
use crate::utils::error::{Result, RiskError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MODEL_PATH: &str = "models/";
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "json";
pub const DEFAULT_RISK_SCORE: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub app: AppConfig,
    pub ml: MlConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlConfig {
    pub model_path: String,
    pub artifact_extension: Option<String>,
    pub default_risk_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RiskError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RiskError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 沒有設定檔時改讀環境變數
    pub fn from_env() -> Result<Self> {
        let default_risk_score = match std::env::var("DEFAULT_RISK_SCORE") {
            Ok(raw) => Some(raw.trim().parse::<f64>().map_err(|e| {
                RiskError::InvalidConfigValueError {
                    field: "DEFAULT_RISK_SCORE".to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?),
            Err(_) => None,
        };

        Ok(Self {
            app: AppConfig::default(),
            ml: MlConfig {
                model_path: std::env::var("MODEL_PATH")
                    .unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string()),
                artifact_extension: std::env::var("ARTIFACT_EXTENSION").ok(),
                default_risk_score,
            },
            logging: std::env::var("LOG_LEVEL").ok().map(|level| LoggingConfig {
                level: Some(level),
                format: None,
            }),
        })
    }

    /// 替換環境變數 (例如 ${MODEL_PATH})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| RiskError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("ml.model_path", &self.ml.model_path)?;
        validation::validate_extension("ml.artifact_extension", self.artifact_extension())?;
        validation::validate_finite("ml.default_risk_score", self.default_risk_score())?;

        if let Some(level) = self.log_level() {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level) {
                return Err(RiskError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.to_string(),
                    reason: format!("Valid levels: {}", valid_levels.join(", ")),
                });
            }
        }

        Ok(())
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn log_format(&self) -> LogFormat {
        self.logging
            .as_ref()
            .and_then(|l| l.format)
            .unwrap_or_default()
    }
}

impl ModelSettings for TomlConfig {
    fn model_path(&self) -> &str {
        &self.ml.model_path
    }

    fn artifact_extension(&self) -> &str {
        self.ml
            .artifact_extension
            .as_deref()
            .unwrap_or(DEFAULT_ARTIFACT_EXTENSION)
    }

    fn default_risk_score(&self) -> f64 {
        self.ml.default_risk_score.unwrap_or(DEFAULT_RISK_SCORE)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[app]
name = "accident-risk"
version = "1.0.0"

[ml]
model_path = "/srv/models"
artifact_extension = "json"
default_risk_score = 0.4

[logging]
level = "debug"
format = "json"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.app.name, "accident-risk");
        assert_eq!(config.model_path(), "/srv/models");
        assert_eq!(config.default_risk_score(), 0.4);
        assert_eq!(config.log_format(), LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_optional_fields_missing() {
        let config = TomlConfig::from_toml_str("[ml]\nmodel_path = \"models/\"\n").unwrap();

        assert_eq!(config.artifact_extension(), "json");
        assert_eq!(config.default_risk_score(), 0.5);
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert_eq!(config.app.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("ACCIDENT_RISK_TEST_MODEL_DIR", "/opt/risk-models");

        let toml_content = r#"
[ml]
model_path = "${ACCIDENT_RISK_TEST_MODEL_DIR}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.ml.model_path, "/opt/risk-models");

        std::env::remove_var("ACCIDENT_RISK_TEST_MODEL_DIR");
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str(
            "[ml]\nmodel_path = \"models/\"\nartifact_extension = \"../pkl\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str(
            "[ml]\nmodel_path = \"models/\"\n[logging]\nlevel = \"loud\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_ml_section_is_rejected() {
        let err = TomlConfig::from_toml_str("[app]\nname = \"x\"\nversion = \"1\"\n").unwrap_err();
        assert!(matches!(err, RiskError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[ml]\nmodel_path = \"./trained\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.model_path(), "./trained");
    }
}
