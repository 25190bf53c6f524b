//! Command dispatch

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, error, info};

use crate::app::cli::{Cli, Command};
use crate::config::settings::Settings;
use crate::deploy::executor::{ExecutorOptions, PipelineExecutor};
use crate::deploy::pipeline::Pipeline;
use crate::deploy::plan::{self, PushOptions, UpOptions};
use crate::deploy::readiness::HttpProbe;
use crate::deploy::runner::{CommandRunner, DryRunRunner, SystemRunner};
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::models::report::PipelineReport;
use crate::utils::{print_diagnostic, run_diagnostic, version_info};

/// Timeout for a single readiness request
const PROBE_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Load the settings file, then overlay the environment and global flags
pub async fn load_settings(cli: &Cli) -> Result<Settings, DeployError> {
    let mut settings = Settings::load(cli.config.as_deref()).await?;
    settings.apply_env(|key| std::env::var(key).ok())?;
    if let Some(engine) = cli.engine {
        settings.engine = engine;
    }
    Ok(settings)
}

/// Build the pipeline for a command. Returns `None` for commands that do
/// not run a pipeline.
pub fn plan_command<F>(
    command: &Command,
    settings: &mut Settings,
    env: F,
) -> Result<Option<Pipeline>, DeployError>
where
    F: Fn(&str) -> Option<String>,
{
    let pipeline = match command {
        Command::Build(args) => {
            args.image.apply(settings);
            plan::build(settings, args.image.variant.as_deref())?
        }
        Command::PushHub(args) => {
            args.image.apply(settings);
            if let Some(username) = &args.username {
                settings.docker_hub.username = Some(username.clone());
            }
            let options = PushOptions {
                build: args.build,
                variant: args.image.variant.clone(),
                create_repository: false,
            };
            let token = settings.docker_hub_token(&env);
            plan::push_docker_hub(settings, token, &options)?
        }
        Command::PushEcr(args) => {
            args.image.apply(settings);
            args.ecr.apply(settings);
            let options = PushOptions {
                build: args.build,
                variant: args.image.variant.clone(),
                create_repository: args.ecr.create_repository,
            };
            plan::push_ecr(settings, &options)?
        }
        Command::Release(args) => {
            args.image.apply(settings);
            args.ecr.apply(settings);
            if let Some(username) = &args.username {
                settings.docker_hub.username = Some(username.clone());
            }
            let options = PushOptions {
                build: true,
                variant: args.image.variant.clone(),
                create_repository: args.ecr.create_repository,
            };
            let token = settings.docker_hub_token(&env);
            plan::release(settings, args.registry, token, &options)?
        }
        Command::Up(args) => {
            args.apply(settings);
            let options = UpOptions {
                build: settings.compose.build,
                wait: settings.wait.to_strategy()?,
                create_schema: !args.skip_schema,
            };
            plan::up(settings, options)?
        }
        Command::Down => plan::down(settings),
        Command::Diagnostic | Command::Version => return Ok(None),
    };
    Ok(Some(pipeline))
}

/// Run the parsed command line
pub async fn run(cli: Cli, mut settings: Settings) -> anyhow::Result<()> {
    let runner: Arc<dyn CommandRunner> = if cli.dry_run {
        Arc::new(DryRunRunner::new().echo())
    } else {
        Arc::new(SystemRunner)
    };

    match &cli.command {
        Command::Version => {
            println!("{}", serde_json::to_string_pretty(&version_info())?);
            return Ok(());
        }
        Command::Diagnostic => {
            let checks = run_diagnostic(runner.as_ref(), settings.engine).await;
            print_diagnostic(&checks);
            if checks.iter().any(|c| !c.available) {
                anyhow::bail!("Some required tools are not available");
            }
            return Ok(());
        }
        _ => {}
    }

    let pipeline = plan_command(&cli.command, &mut settings, |key| std::env::var(key).ok())?
        .context("Command has no pipeline")?;
    debug!("Planned steps: {:?}", pipeline.step_names());

    let probe = Arc::new(HttpProbe::new(PROBE_REQUEST_TIMEOUT)?);
    let executor = PipelineExecutor::new(
        runner,
        probe,
        ExecutorOptions {
            dry_run: cli.dry_run,
        },
    );

    let report = executor.run(&pipeline).await?;
    if let Some(path) = &cli.report {
        write_report(path, &report)
            .await
            .with_context(|| format!("Unable to write report to {}", path.display()))?;
        info!("Wrote run report to {}", path.display());
    }

    report.check()?;
    Ok(())
}

/// Report a failed run. With `pause_on_error` the console is held until a
/// line is read from `input`.
pub async fn report_failure<R>(error: &anyhow::Error, pause_on_error: bool, input: R)
where
    R: AsyncRead + Unpin,
{
    error!("{:#}", error);
    // Step failures already printed their diagnostic
    if !matches!(
        error.downcast_ref::<DeployError>(),
        Some(DeployError::StepFailed { .. })
    ) {
        eprintln!("{} {:#}", "Error:".red().bold(), error);
    }

    if pause_on_error {
        eprintln!("Press Enter to exit...");
        let mut line = String::new();
        let _ = BufReader::new(input).read_line(&mut line).await;
    }
}

async fn write_report(path: &std::path::Path, report: &PipelineReport) -> Result<(), DeployError> {
    File::new(path).write_json(report).await
}
