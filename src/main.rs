use accident_risk::config::toml_config::{LogFormat, TomlConfig};
use accident_risk::services::batch;
use accident_risk::utils::error::ErrorSeverity;
use accident_risk::utils::logger;
use accident_risk::{CliConfig, Command, ModelKind, PredictionService, RiskError};
use clap::Parser;
use serde_json::{json, Map};
use std::fs::File;
use std::io::{self, BufWriter};

fn main() {
    let config = CliConfig::parse();

    let settings = match config.resolve_settings() {
        Ok(settings) => settings,
        Err(e) => {
            logger::init_cli_logger(config.verbose, None);
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    // 初始化日誌
    match settings.log_format() {
        LogFormat::Compact => logger::init_cli_logger(config.verbose, settings.log_level()),
        LogFormat::Json => logger::init_json_logger(settings.log_level()),
    }

    tracing::info!("🚀 Starting {} {}", settings.app.name, settings.app.version);
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    let service = PredictionService::from_settings(&settings);

    if let Err(e) = run(&config.command, &service, &settings) {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn run(
    command: &Command,
    service: &PredictionService,
    settings: &TomlConfig,
) -> Result<(), RiskError> {
    match command {
        Command::Predict { location, severity } => {
            let score = service.predict_risk(location, severity);
            println!("{}", score);
        }
        Command::Batch { input, output } => {
            let reader = File::open(input)?;
            let count = match output {
                Some(path) => {
                    let writer = BufWriter::new(File::create(path)?);
                    batch::score_csv(service, reader, writer)?
                }
                None => batch::score_csv(service, reader, io::stdout().lock())?,
            };
            tracing::info!("✅ Scored {} rows from {}", count, input);
        }
        Command::Trend {
            count,
            average_severity,
            growth_rate,
        } => {
            let mut data = Map::new();
            for (field, value) in [
                ("count", count),
                ("average_severity", average_severity),
                ("growth_rate", growth_rate),
            ] {
                if let Some(value) = value {
                    data.insert(field.to_string(), json!(value));
                }
            }

            match service.predict_trend(&data) {
                Some(forecast) => println!("{}", serde_json::to_string_pretty(&forecast)?),
                None => println!("unavailable"),
            }
        }
        Command::Inspect => {
            println!("📁 Model directory: {}", settings.ml.model_path);
            for kind in ModelKind::ALL {
                let location = service.cache().artifact_location(kind);
                match service.cache().try_load(kind) {
                    Ok(handle) => println!(
                        "✅ {:<7} {} {}",
                        kind.to_string(),
                        location,
                        serde_json::to_string(&handle.capabilities())?
                    ),
                    Err(e) => println!("⚠️ {:<7} {} ({})", kind.to_string(), location, e),
                }
            }
        }
    }

    Ok(())
}
