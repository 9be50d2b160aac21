use crate::config::toml_config::TomlConfig;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "accident-risk")]
#[command(about = "Risk scoring for accident reports backed by cached ML models")]
pub struct CliConfig {
    /// Path to TOML configuration file (falls back to environment variables)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the model directory from config
    #[arg(long)]
    pub model_path: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Score a single accident
    Predict {
        #[arg(long)]
        location: String,
        #[arg(long)]
        severity: String,
    },
    /// Score every row of a CSV file with a `location,severity` header
    Batch {
        #[arg(long)]
        input: String,
        /// Write results here instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
    /// Forecast the accident trend from summary statistics
    Trend {
        #[arg(long)]
        count: Option<f64>,
        #[arg(long)]
        average_severity: Option<f64>,
        #[arg(long)]
        growth_rate: Option<f64>,
    },
    /// Show which model artifacts are present and what they support
    Inspect,
}

impl CliConfig {
    /// 載入設定檔 (或環境變數)，套用命令列覆蓋後驗證
    pub fn resolve_settings(&self) -> Result<TomlConfig> {
        let mut settings = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::from_env()?,
        };

        if let Some(model_path) = &self.model_path {
            settings.ml.model_path = model_path.clone();
        }

        settings.validate()?;
        Ok(settings)
    }
}
