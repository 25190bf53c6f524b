//! Pipeline executor

use std::sync::Arc;
use std::time::Instant;

use colored::Colorize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::deploy::ecr;
use crate::deploy::fsm::{RunEvent, RunFsm, RunState};
use crate::deploy::pipeline::{Pipeline, Step, StepAction};
use crate::deploy::readiness::{wait_until_ready, ReadinessProbe};
use crate::deploy::runner::{CommandOutcome, CommandRunner, CommandSpec};
use crate::errors::DeployError;
use crate::models::report::{PipelineReport, StepFailure, StepReport, StepStatus};

/// Executor options
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Commands are recorded, not run
    pub dry_run: bool,
}

/// Runs pipelines one step at a time, stopping at the first failure
pub struct PipelineExecutor {
    runner: Arc<dyn CommandRunner>,
    probe: Arc<dyn ReadinessProbe>,
    options: ExecutorOptions,
    fsm: RwLock<RunFsm>,
    fallback_choice: RwLock<Option<usize>>,
}

impl PipelineExecutor {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        probe: Arc<dyn ReadinessProbe>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            runner,
            probe,
            options,
            fsm: RwLock::new(RunFsm::new()),
            fallback_choice: RwLock::new(None),
        }
    }

    /// Get the current run state
    pub async fn state(&self) -> RunState {
        self.fsm.read().await.state()
    }

    /// Run the pipeline.
    ///
    /// A failing step is reported through the returned report (see
    /// [`PipelineReport::check`]); `Err` is reserved for executor misuse.
    pub async fn run(&self, pipeline: &Pipeline) -> Result<PipelineReport, DeployError> {
        info!("Running pipeline: {}", pipeline.name);
        let mut report = PipelineReport::new(&pipeline.name, self.options.dry_run);

        {
            let mut fsm = self.fsm.write().await;
            if fsm.state() != RunState::Pending {
                fsm.process(RunEvent::Reset)?;
            }
            fsm.process(RunEvent::Start)?;
        }
        *self.fallback_choice.write().await = None;
        report.state = RunState::Running;

        let mut failed = false;
        for (index, step) in pipeline.steps.iter().enumerate() {
            let action = step.action.describe();

            if failed {
                report.steps.push(StepReport {
                    name: step.name.clone(),
                    action,
                    status: StepStatus::Skipped,
                    duration_ms: 0,
                    error: None,
                });
                continue;
            }

            info!(
                "[{}/{}] {}: {}",
                index + 1,
                pipeline.steps.len(),
                step.name,
                action
            );
            let started = Instant::now();
            let result = self.execute_step(step).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    debug!("Step {} completed in {}ms", step.name, duration_ms);
                    self.fsm
                        .write()
                        .await
                        .process(RunEvent::StepCompleted(step.name.clone()))?;
                    report.steps.push(StepReport {
                        name: step.name.clone(),
                        action,
                        status: StepStatus::Succeeded,
                        duration_ms,
                        error: None,
                    });
                }
                Err(e) => {
                    error!("Step {} failed: {}", step.name, e);
                    self.fsm.write().await.process(RunEvent::StepFailed {
                        step: step.name.clone(),
                        error: e.to_string(),
                    })?;
                    report.steps.push(StepReport {
                        name: step.name.clone(),
                        action,
                        status: StepStatus::Failed,
                        duration_ms,
                        error: Some(e.to_string()),
                    });
                    report.failure = Some(StepFailure {
                        step: step.name.clone(),
                        message: step.failure_message.clone(),
                    });
                    failed = true;
                }
            }
        }

        if failed {
            report.state = RunState::Failed;
        } else {
            self.fsm.write().await.process(RunEvent::Finish)?;
            report.state = RunState::Succeeded;
            info!("Pipeline {} completed", pipeline.name);
        }
        report.finished_at = Some(chrono::Utc::now());

        if let Some(failure) = &report.failure {
            eprintln!("{} {}", "Error:".red().bold(), failure.message);
        }

        Ok(report)
    }

    async fn execute_step(&self, step: &Step) -> Result<(), DeployError> {
        match &step.action {
            StepAction::Command(spec) => {
                let outcome = self.runner.run(spec).await?;
                ensure_success(spec, &outcome)
            }
            StepAction::FirstAvailable(candidates) => {
                let mut unavailable = None;
                for (index, candidate) in candidates.iter().enumerate() {
                    match self.runner.run(&candidate.check).await {
                        Ok(check) if check.success => {
                            *self.fallback_choice.write().await = Some(index);
                            let outcome = self.runner.run(&candidate.command).await?;
                            return ensure_success(&candidate.command, &outcome);
                        }
                        Ok(check) => {
                            unavailable =
                                Some(DeployError::command_failed(&candidate.check, check.code));
                        }
                        Err(e) => unavailable = Some(e),
                    }
                    debug!("'{}' is not available", candidate.check);
                }
                Err(unavailable
                    .unwrap_or_else(|| DeployError::Internal("No command to run".to_string())))
            }
            StepAction::FollowFallback(candidates) => {
                let index = self.fallback_choice.read().await.unwrap_or(0);
                let spec = candidates
                    .get(index)
                    .or_else(|| candidates.first())
                    .ok_or_else(|| DeployError::Internal("No command to run".to_string()))?;
                let outcome = self.runner.run(spec).await?;
                ensure_success(spec, &outcome)
            }
            StepAction::EcrLogin {
                engine,
                region,
                registry,
            } => ecr::login(self.runner.as_ref(), *engine, region, registry).await,
            StepAction::EnsureEcrRepository { region, repository } => {
                ecr::ensure_repository(self.runner.as_ref(), region, repository).await
            }
            StepAction::Wait(strategy) => {
                if self.options.dry_run {
                    info!("[dry-run] {}", strategy.describe());
                    return Ok(());
                }
                wait_until_ready(strategy, self.probe.as_ref()).await
            }
        }
    }
}

fn ensure_success(spec: &CommandSpec, outcome: &CommandOutcome) -> Result<(), DeployError> {
    if outcome.success {
        Ok(())
    } else {
        Err(DeployError::command_failed(spec, outcome.code))
    }
}
