//! Container engine selection

use serde::{Deserialize, Serialize};

use crate::deploy::runner::CommandSpec;

/// Container engine CLI to drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContainerEngine {
    #[default]
    Docker,
    Podman,
}

impl ContainerEngine {
    /// Get the command name for this engine
    pub fn command(&self) -> &'static str {
        match self {
            ContainerEngine::Docker => "docker",
            ContainerEngine::Podman => "podman",
        }
    }

    /// Compose invocations in order of preference: the plugin form first,
    /// then the standalone binary.
    pub fn compose_commands(&self) -> [CommandSpec; 2] {
        match self {
            ContainerEngine::Docker => [
                CommandSpec::new("docker").arg("compose"),
                CommandSpec::new("docker-compose"),
            ],
            ContainerEngine::Podman => [
                CommandSpec::new("podman").arg("compose"),
                CommandSpec::new("podman-compose"),
            ],
        }
    }
}

impl std::str::FromStr for ContainerEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docker" => Ok(ContainerEngine::Docker),
            "podman" => Ok(ContainerEngine::Podman),
            _ => Err(format!("Unsupported container engine: {}", s)),
        }
    }
}
