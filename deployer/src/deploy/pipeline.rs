//! Pipeline and step definitions

use crate::deploy::engine::ContainerEngine;
use crate::deploy::readiness::WaitStrategy;
use crate::deploy::runner::CommandSpec;

/// What a step does
#[derive(Debug)]
pub enum StepAction {
    /// Run one command; a non-zero exit fails the step
    Command(CommandSpec),

    /// Run the command of the first candidate whose availability check
    /// passes. The chosen command's own failure fails the step.
    FirstAvailable(Vec<Candidate>),

    /// Run the candidate at the position chosen by the last `FirstAvailable`
    /// step of the run, or the first one when there was none. Keeps later
    /// compose calls on the flavour that brought the stack up.
    FollowFallback(Vec<CommandSpec>),

    /// Log the engine in to an ECR registry
    EcrLogin {
        engine: ContainerEngine,
        region: String,
        registry: String,
    },

    /// Create the ECR repository when it does not exist
    EnsureEcrRepository { region: String, repository: String },

    /// Wait for the stack to come up
    Wait(WaitStrategy),
}

/// A command together with the check that tells whether its tool is installed
#[derive(Debug)]
pub struct Candidate {
    pub check: CommandSpec,
    pub command: CommandSpec,
}

impl StepAction {
    /// Pair each availability check with the command at the same position
    pub fn first_available(checks: Vec<CommandSpec>, commands: Vec<CommandSpec>) -> Self {
        StepAction::FirstAvailable(
            checks
                .into_iter()
                .zip(commands)
                .map(|(check, command)| Candidate { check, command })
                .collect(),
        )
    }

    /// Human-readable rendering for logs and reports
    pub fn describe(&self) -> String {
        match self {
            StepAction::Command(spec) => spec.to_string(),
            StepAction::FirstAvailable(candidates) => candidates
                .iter()
                .map(|c| c.command.to_string())
                .collect::<Vec<_>>()
                .join(" || "),
            StepAction::FollowFallback(specs) => specs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" || "),
            StepAction::EcrLogin {
                engine,
                region,
                registry,
            } => format!(
                "aws ecr get-login-password --region {} | {} login --username AWS --password-stdin {}",
                region,
                engine.command(),
                registry
            ),
            StepAction::EnsureEcrRepository { region, repository } => {
                format!("ensure ECR repository {} in {}", repository, region)
            }
            StepAction::Wait(strategy) => strategy.describe(),
        }
    }
}

/// One pipeline step with its fixed failure diagnostic
#[derive(Debug)]
pub struct Step {
    pub name: String,
    pub action: StepAction,
    pub failure_message: String,
}

impl Step {
    pub fn new(name: impl Into<String>, action: StepAction, failure_message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action,
            failure_message: failure_message.into(),
        }
    }

    pub fn command(name: impl Into<String>, spec: CommandSpec, failure_message: impl Into<String>) -> Self {
        Self::new(name, StepAction::Command(spec), failure_message)
    }
}

/// A linear sequence of steps
#[derive(Debug)]
pub struct Pipeline {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append another pipeline's steps
    pub fn then(mut self, other: Pipeline) -> Self {
        self.steps.extend(other.steps);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}
