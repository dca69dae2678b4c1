//! Config validation CLI tool
//!
//! Validates a bbtimer configuration file and reports any errors.

use bbtimer_config::NotificationMode;
use bbtimer_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn mode_label(mode: NotificationMode) -> &'static str {
    match mode {
        NotificationMode::None => "none",
        NotificationMode::Voice => "voice",
        NotificationMode::Beep => "beep",
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a bbtimer configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match bbtimer_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", bbtimer_config::CURRENT_CONFIG_VERSION);
            println!("  Cache generation: {}", config.manifest.generation_key());
            println!("  Fallback: {}", config.manifest.fallback_url);
            println!(
                "  Timer: {}s, warning at {}s (end: {}, warning: {})",
                config.timer.full_seconds,
                config.timer.warn_seconds,
                mode_label(config.timer.end_notification),
                mode_label(config.timer.warn_notification),
            );

            println!();
            println!("Assets ({}):", config.manifest.urls.len());
            for url in &config.manifest.urls {
                println!("  - {}", url);
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                bbtimer_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                bbtimer_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                bbtimer_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                bbtimer_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        bbtimer_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
