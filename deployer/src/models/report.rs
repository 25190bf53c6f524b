//! Pipeline run reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::deploy::fsm::RunState;
use crate::errors::DeployError;

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// Not run because an earlier step failed
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub action: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The failing step and its fixed diagnostic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: String,
    pub message: String,
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub pipeline: String,
    pub dry_run: bool,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
}

impl PipelineReport {
    pub fn new(pipeline: impl Into<String>, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline: pipeline.into(),
            dry_run,
            state: RunState::Pending,
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            failure: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }

    /// Turn a failed run into its step error
    pub fn check(&self) -> Result<(), DeployError> {
        match &self.failure {
            Some(failure) => Err(DeployError::StepFailed {
                step: failure.step.clone(),
                message: failure.message.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }
}
