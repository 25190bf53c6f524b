//! Utility functions

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::deploy::engine::ContainerEngine;
use crate::deploy::runner::{CommandRunner, CommandSpec};
use crate::deploy::{compose, docker, ecr};

/// Version information for bookdeploy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Cooldown options for exponential backoff
#[derive(Debug, Clone)]
pub struct CooldownOptions {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for CooldownOptions {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300), // 5 minutes
            multiplier: 2.0,
        }
    }
}

/// Calculate exponential backoff delay
pub fn calc_exp_backoff(options: &CooldownOptions, attempt: u32) -> Duration {
    let exponent = attempt.min(i32::MAX as u32) as i32;
    let delay_secs = options.base_delay.as_secs_f64() * options.multiplier.powi(exponent);
    let capped_delay = delay_secs.min(options.max_delay.as_secs_f64());
    Duration::try_from_secs_f64(capped_delay).unwrap_or(options.max_delay)
}

/// One tool availability check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticCheck {
    pub name: String,
    pub command: String,
    pub available: bool,
}

async fn probe(runner: &dyn CommandRunner, name: &str, candidates: Vec<CommandSpec>) -> DiagnosticCheck {
    let mut last = String::new();
    for spec in candidates {
        last = spec.to_string();
        if matches!(runner.run(&spec).await, Ok(outcome) if outcome.success) {
            return DiagnosticCheck {
                name: name.to_string(),
                command: last,
                available: true,
            };
        }
    }
    DiagnosticCheck {
        name: name.to_string(),
        command: last,
        available: false,
    }
}

/// Check that the external CLIs the pipelines shell out to are callable
pub async fn run_diagnostic(runner: &dyn CommandRunner, engine: ContainerEngine) -> Vec<DiagnosticCheck> {
    vec![
        probe(runner, "container engine", vec![docker::version(engine)]).await,
        probe(runner, "compose", compose::version(engine)).await,
        probe(runner, "aws cli", vec![ecr::cli_version()]).await,
    ]
}

/// Print diagnostic results, one line per check
pub fn print_diagnostic(checks: &[DiagnosticCheck]) {
    for check in checks {
        if check.available {
            println!("{} {} ({})", "ok".green().bold(), check.name, check.command);
        } else {
            println!("{} {} ({})", "missing".red().bold(), check.name, check.command);
        }
    }
}
