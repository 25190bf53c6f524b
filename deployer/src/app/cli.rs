//! Command line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::settings::{Settings, WaitKind};
use crate::deploy::engine::ContainerEngine;
use crate::deploy::plan::Registry;
use crate::logs::LogLevel;

/// Build, push and start the Book Management Agent containers
#[derive(Debug, Parser)]
#[command(name = "bookdeploy", version, about)]
pub struct Cli {
    /// Settings file (defaults to ./bookdeploy.json when present)
    #[arg(long, global = true, env = "BOOKDEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Also append JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Print the commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Write a JSON run report to this file
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,

    /// Wait for Enter before exiting after a failure
    #[arg(long, global = true)]
    pub pause_on_error: bool,

    /// Container engine CLI
    #[arg(long, global = true, value_enum)]
    pub engine: Option<ContainerEngine>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the application image
    Build(BuildArgs),

    /// Tag and push the image to Docker Hub
    PushHub(PushHubArgs),

    /// Tag and push the image to AWS ECR
    PushEcr(PushEcrArgs),

    /// Build, then push to a registry
    Release(ReleaseArgs),

    /// Start the compose stack, wait, then create the database schema
    Up(UpArgs),

    /// Stop the compose stack
    Down,

    /// Check that docker, compose and the AWS CLI are available
    Diagnostic,

    /// Print version information as JSON
    Version,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ImageArgs {
    /// Image tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Dockerfile variant
    #[arg(long)]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct EcrArgs {
    /// AWS region
    #[arg(long)]
    pub region: Option<String>,

    /// AWS account id
    #[arg(long)]
    pub account_id: Option<String>,

    /// ECR repository name
    #[arg(long)]
    pub repository: Option<String>,

    /// Create the repository when it does not exist
    #[arg(long)]
    pub create_repository: bool,
}

#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub image: ImageArgs,
}

#[derive(Debug, Clone, Args)]
pub struct PushHubArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    /// Docker Hub username
    #[arg(long)]
    pub username: Option<String>,

    /// Build the image first
    #[arg(long)]
    pub build: bool,
}

#[derive(Debug, Clone, Args)]
pub struct PushEcrArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    #[command(flatten)]
    pub ecr: EcrArgs,

    /// Build the image first
    #[arg(long)]
    pub build: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ReleaseArgs {
    /// Registry to push to
    #[arg(long, value_enum)]
    pub registry: Registry,

    #[command(flatten)]
    pub image: ImageArgs,

    /// Docker Hub username
    #[arg(long)]
    pub username: Option<String>,

    #[command(flatten)]
    pub ecr: EcrArgs,
}

#[derive(Debug, Clone, Args)]
pub struct UpArgs {
    /// Do not pass --build to compose up
    #[arg(long)]
    pub no_build: bool,

    /// Wait strategy before creating the schema
    #[arg(long, value_enum)]
    pub wait: Option<WaitKind>,

    /// Fixed wait in seconds
    #[arg(long)]
    pub delay_secs: Option<u64>,

    /// Readiness URL for the health wait
    #[arg(long)]
    pub health_url: Option<String>,

    /// Give up on the health wait after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Do not run the schema creation command
    #[arg(long)]
    pub skip_schema: bool,
}

impl ImageArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(tag) = &self.tag {
            settings.image.tag = tag.clone();
        }
    }
}

impl EcrArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(region) = &self.region {
            settings.ecr.region = region.clone();
        }
        if let Some(account_id) = &self.account_id {
            settings.ecr.account_id = Some(account_id.clone());
        }
        if let Some(repository) = &self.repository {
            settings.ecr.repository = Some(repository.clone());
        }
    }
}

impl UpArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(wait) = self.wait {
            settings.wait.strategy = wait;
        }
        if let Some(delay) = self.delay_secs {
            settings.wait.delay_secs = delay;
        }
        if let Some(url) = &self.health_url {
            settings.wait.health_url = url.clone();
        }
        if let Some(timeout) = self.timeout_secs {
            settings.wait.timeout_secs = timeout;
        }
        if self.no_build {
            settings.compose.build = false;
        }
    }
}
