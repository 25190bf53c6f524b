//! Finite State Machine for a pipeline run

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Not started
    Pending,

    /// Steps are executing
    Running,

    /// Every step succeeded
    Succeeded,

    /// A step failed and the run stopped
    Failed,
}

/// Run event
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Start the run
    Start,

    /// A step finished successfully
    StepCompleted(String),

    /// A step failed
    StepFailed { step: String, error: String },

    /// All steps finished
    Finish,

    /// Reset to pending
    Reset,
}

/// Run FSM
#[derive(Debug, Clone)]
pub struct RunFsm {
    state: RunState,
    completed_steps: Vec<String>,
    failed_step: Option<String>,
    error: Option<String>,
}

impl RunFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: RunState::Pending,
            completed_steps: Vec::new(),
            failed_step: None,
            error: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn failed_step(&self) -> Option<&str> {
        self.failed_step.as_deref()
    }

    pub fn completed_steps(&self) -> &[String] {
        &self.completed_steps
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: RunEvent) -> Result<(), DeployError> {
        let new_state = match (self.state, event) {
            (RunState::Pending, RunEvent::Start) => RunState::Running,

            (RunState::Running, RunEvent::StepCompleted(step)) => {
                self.completed_steps.push(step);
                RunState::Running
            }
            (RunState::Running, RunEvent::StepFailed { step, error }) => {
                self.failed_step = Some(step);
                self.error = Some(error);
                RunState::Failed
            }
            (RunState::Running, RunEvent::Finish) => RunState::Succeeded,

            (RunState::Succeeded | RunState::Failed, RunEvent::Reset) => {
                self.completed_steps.clear();
                self.failed_step = None;
                self.error = None;
                RunState::Pending
            }

            // Failures are terminal until reset
            (state, event) => {
                return Err(DeployError::TransitionError(format!(
                    "{:?} -> {:?}",
                    state, event
                )));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for RunFsm {
    fn default() -> Self {
        Self::new()
    }
}
