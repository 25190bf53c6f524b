//! bookdeploy - Entry Point
//!
//! Builds the Book Management Agent image, pushes it to Docker Hub or AWS
//! ECR, and brings up the compose stack with its database schema.

use std::process::ExitCode;

use bookdeploy::app::cli::Cli;
use bookdeploy::app::run::{load_settings, report_failure, run};
use bookdeploy::logs::{init_logging, LogOptions};

use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let pause_on_error = cli.pause_on_error;

    let settings = match load_settings(&cli).await {
        Ok(settings) => settings,
        Err(e) => {
            report_failure(&anyhow::Error::from(e), pause_on_error, tokio::io::stdin()).await;
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: cli.log_level.unwrap_or(settings.log_level),
        log_file: cli.log_file.clone(),
        json_format: cli.json_logs,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    info!("Running bookdeploy {}", env!("CARGO_PKG_VERSION"));
    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&e, pause_on_error, tokio::io::stdin()).await;
            ExitCode::FAILURE
        }
    }
}
