//! Error types for bookdeploy

use thiserror::Error;

/// Main error type for deployment runs
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing deployment parameter '{name}' ({hint})")]
    MissingParameter { name: String, hint: String },

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' failed with {}", exit_status(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("Step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },

    #[error("Readiness error: {0}")]
    ReadinessError(String),

    #[error("Invalid state transition: {0}")]
    TransitionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    pub fn missing(name: impl Into<String>, hint: impl Into<String>) -> Self {
        DeployError::MissingParameter {
            name: name.into(),
            hint: hint.into(),
        }
    }

    pub fn command_failed(command: impl std::fmt::Display, code: Option<i32>) -> Self {
        DeployError::CommandFailed {
            command: command.to_string(),
            code,
        }
    }
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "no exit status (terminated by signal)".to_string(),
    }
}
