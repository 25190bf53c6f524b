//! AWS Elastic Container Registry helpers

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::config::settings::EcrTarget;
use crate::deploy::docker;
use crate::deploy::engine::ContainerEngine;
use crate::deploy::runner::{CommandRunner, CommandSpec};
use crate::errors::DeployError;
use crate::models::image::ImageRef;

/// Registry host for an account and region
pub fn registry_host(account_id: &str, region: &str) -> String {
    format!("{}.dkr.ecr.{}.amazonaws.com", account_id, region)
}

impl EcrTarget {
    pub fn registry(&self) -> String {
        registry_host(&self.account_id, &self.region)
    }

    /// The pushed image reference for `local`
    pub fn image(&self, local: &ImageRef) -> ImageRef {
        local.retarget(Some(self.registry()), self.repository.clone())
    }
}

pub fn get_login_password(region: &str) -> CommandSpec {
    CommandSpec::new("aws")
        .args(["ecr", "get-login-password", "--region", region])
        .capture_stdout()
}

pub fn describe_repository(region: &str, repository: &str) -> CommandSpec {
    CommandSpec::new("aws")
        .args(["ecr", "describe-repositories", "--repository-names", repository])
        .args(["--region", region])
        .quiet()
}

pub fn create_repository(region: &str, repository: &str) -> CommandSpec {
    CommandSpec::new("aws")
        .args(["ecr", "create-repository", "--repository-name", repository])
        .args(["--region", region])
}

/// `aws --version`, used to probe for the CLI
pub fn cli_version() -> CommandSpec {
    CommandSpec::new("aws").arg("--version").quiet()
}

/// Authenticate the container engine against the ECR registry.
///
/// The password from `get-login-password` is only ever held as a secret and
/// handed to the engine on stdin.
pub async fn login(
    runner: &dyn CommandRunner,
    engine: ContainerEngine,
    region: &str,
    registry: &str,
) -> Result<(), DeployError> {
    debug!("Requesting ECR login password for {}", region);
    let password_cmd = get_login_password(region);
    let outcome = runner.run(&password_cmd).await?;
    if !outcome.success {
        return Err(DeployError::command_failed(&password_cmd, outcome.code));
    }

    let password = SecretString::from(outcome.stdout);
    if password.expose_secret().trim().is_empty() {
        return Err(DeployError::Internal(
            "ECR returned an empty login password".to_string(),
        ));
    }

    let login_cmd = docker::login_password_stdin(engine, Some(registry), "AWS", password);
    let outcome = runner.run(&login_cmd).await?;
    if !outcome.success {
        return Err(DeployError::command_failed(&login_cmd, outcome.code));
    }

    info!("Logged in to {}", registry);
    Ok(())
}

/// Create the repository unless it already exists
pub async fn ensure_repository(
    runner: &dyn CommandRunner,
    region: &str,
    repository: &str,
) -> Result<(), DeployError> {
    let outcome = runner.run(&describe_repository(region, repository)).await?;
    if outcome.success {
        debug!("ECR repository {} exists", repository);
        return Ok(());
    }

    info!("Creating ECR repository {} in {}", repository, region);
    let create_cmd = create_repository(region, repository);
    let outcome = runner.run(&create_cmd).await?;
    if !outcome.success {
        return Err(DeployError::command_failed(&create_cmd, outcome.code));
    }
    Ok(())
}
