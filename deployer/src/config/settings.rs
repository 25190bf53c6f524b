//! Settings file management

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::deploy::engine::ContainerEngine;
use crate::deploy::readiness::WaitStrategy;
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::models::image::ImageRef;

/// Settings file looked up in the working directory when none is given
pub const DEFAULT_SETTINGS_FILE: &str = "bookdeploy.json";

/// Deployment settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Container engine CLI
    #[serde(default)]
    pub engine: ContainerEngine,

    /// Application image
    #[serde(default)]
    pub image: ImageSettings,

    /// Image build configuration
    #[serde(default)]
    pub build: BuildSettings,

    /// Docker Hub registry
    #[serde(default)]
    pub docker_hub: DockerHubSettings,

    /// AWS ECR registry
    #[serde(default)]
    pub ecr: EcrSettings,

    /// Compose stack
    #[serde(default)]
    pub compose: ComposeSettings,

    /// Wait between stack start and schema creation
    #[serde(default)]
    pub wait: WaitSettings,
}

/// Image name and tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    #[serde(default = "default_image_name")]
    pub name: String,

    #[serde(default = "default_image_tag")]
    pub tag: String,
}

fn default_image_name() -> String {
    "book-management-agent".to_string()
}

fn default_image_tag() -> String {
    "latest".to_string()
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            name: default_image_name(),
            tag: default_image_tag(),
        }
    }
}

/// Build context and Dockerfile variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    #[serde(default = "default_context")]
    pub context: PathBuf,

    /// Variant name to Dockerfile path
    #[serde(default = "default_dockerfiles")]
    pub dockerfiles: BTreeMap<String, PathBuf>,

    #[serde(default = "default_variant")]
    pub default_variant: String,
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_dockerfiles() -> BTreeMap<String, PathBuf> {
    BTreeMap::from([(default_variant(), PathBuf::from("Dockerfile"))])
}

fn default_variant() -> String {
    "default".to_string()
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            context: default_context(),
            dockerfiles: default_dockerfiles(),
            default_variant: default_variant(),
        }
    }
}

impl BuildSettings {
    /// Resolve the Dockerfile for a variant, falling back to the default variant
    pub fn dockerfile(&self, variant: Option<&str>) -> Result<&Path, DeployError> {
        let variant = variant.unwrap_or(&self.default_variant);
        self.dockerfiles
            .get(variant)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                let known: Vec<&str> = self.dockerfiles.keys().map(String::as_str).collect();
                DeployError::ConfigError(format!(
                    "Unknown Dockerfile variant '{}' (known: {})",
                    variant,
                    known.join(", ")
                ))
            })
    }
}

/// Docker Hub settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerHubSettings {
    #[serde(default)]
    pub username: Option<String>,

    /// Environment variable holding an access token. When unset the
    /// login is interactive.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "DOCKERHUB_TOKEN".to_string()
}

impl Default for DockerHubSettings {
    fn default() -> Self {
        Self {
            username: None,
            token_env: default_token_env(),
        }
    }
}

/// AWS ECR settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcrSettings {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(default)]
    pub repository: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for EcrSettings {
    fn default() -> Self {
        Self {
            region: default_region(),
            account_id: None,
            repository: None,
        }
    }
}

/// Resolved ECR push target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcrTarget {
    pub region: String,
    pub account_id: String,
    pub repository: String,
}

/// Compose stack settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeSettings {
    #[serde(default = "default_compose_file")]
    pub file: PathBuf,

    #[serde(default = "default_context")]
    pub project_dir: PathBuf,

    /// Service the schema command runs in
    #[serde(default = "default_app_service")]
    pub app_service: String,

    /// Pass `--build` to `compose up`
    #[serde(default = "default_true")]
    pub build: bool,

    #[serde(default = "default_schema_command")]
    pub schema_command: Vec<String>,
}

fn default_compose_file() -> PathBuf {
    PathBuf::from("docker-compose.yml")
}

fn default_app_service() -> String {
    "app".to_string()
}

fn default_true() -> bool {
    true
}

fn default_schema_command() -> Vec<String> {
    vec![
        "python".to_string(),
        "-c".to_string(),
        "import asyncio; from app.database import init_database; asyncio.run(init_database())"
            .to_string(),
    ]
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            file: default_compose_file(),
            project_dir: default_context(),
            app_service: default_app_service(),
            build: true,
            schema_command: default_schema_command(),
        }
    }
}

/// How to wait for the stack before creating the schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WaitKind {
    /// Sleep for a fixed delay
    #[default]
    Fixed,
    /// Poll the health endpoint
    Health,
}

/// Wait settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitSettings {
    #[serde(default)]
    pub strategy: WaitKind,

    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,

    #[serde(default = "default_health_url")]
    pub health_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_delay_secs() -> u64 {
    10
}

fn default_health_url() -> String {
    "http://localhost:8000/health".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_interval_secs() -> u64 {
    2
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            strategy: WaitKind::Fixed,
            delay_secs: default_delay_secs(),
            health_url: default_health_url(),
            timeout_secs: default_timeout_secs(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl WaitSettings {
    pub fn to_strategy(&self) -> Result<WaitStrategy, DeployError> {
        match self.strategy {
            WaitKind::Fixed => Ok(WaitStrategy::Fixed {
                delay: Duration::from_secs(self.delay_secs),
            }),
            WaitKind::Health => {
                let url = Url::parse(&self.health_url).map_err(|e| {
                    DeployError::ConfigError(format!(
                        "Invalid health URL '{}': {}",
                        self.health_url, e
                    ))
                })?;
                if self.interval_secs == 0 {
                    return Err(DeployError::ConfigError(
                        "Health poll interval must be at least 1 second".to_string(),
                    ));
                }
                Ok(WaitStrategy::Health {
                    url,
                    timeout: Duration::from_secs(self.timeout_secs),
                    interval: Duration::from_secs(self.interval_secs),
                })
            }
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    ///
    /// With no explicit path the default file is read when present and
    /// defaults are used otherwise.
    pub async fn load(path: Option<&Path>) -> Result<Self, DeployError> {
        let (file, explicit) = match path {
            Some(path) => (File::new(path), true),
            None => (File::new(DEFAULT_SETTINGS_FILE), false),
        };

        if !explicit && !file.exists().await {
            debug!("No {} found, using default settings", DEFAULT_SETTINGS_FILE);
            return Ok(Self::default());
        }

        debug!("Reading settings from {}", file.path().display());
        file.read_json::<Settings>().await.map_err(|e| {
            DeployError::ConfigError(format!(
                "Unable to read settings file {}: {}",
                file.path().display(),
                e
            ))
        })
    }

    /// Overlay environment overrides. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), DeployError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("IMAGE_NAME") {
            self.image.name = v;
        }
        if let Some(v) = get("IMAGE_TAG") {
            self.image.tag = v;
        }
        if let Some(v) = get("BUILD_VARIANT") {
            self.build.default_variant = v;
        }
        if let Some(v) = get("DOCKERHUB_USERNAME") {
            self.docker_hub.username = Some(v);
        }
        if let Some(v) = get("AWS_REGION") {
            self.ecr.region = v;
        }
        if let Some(v) = get("AWS_ACCOUNT_ID") {
            self.ecr.account_id = Some(v);
        }
        if let Some(v) = get("ECR_REPOSITORY") {
            self.ecr.repository = Some(v);
        }
        if let Some(v) = get("COMPOSE_FILE") {
            self.compose.file = PathBuf::from(v);
        }
        if let Some(v) = get("APP_SERVICE") {
            self.compose.app_service = v;
        }
        if let Some(v) = get("CONTAINER_ENGINE") {
            self.engine = v.parse().map_err(DeployError::ConfigError)?;
        }
        if let Some(v) = get("BOOKDEPLOY_LOG_LEVEL") {
            self.log_level = v.parse().map_err(DeployError::ConfigError)?;
        }
        Ok(())
    }

    /// The locally built image
    pub fn local_image(&self) -> Result<ImageRef, DeployError> {
        let name = non_blank(Some(&self.image.name))
            .ok_or_else(|| DeployError::missing("image.name", "set IMAGE_NAME"))?;
        let tag = non_blank(Some(&self.image.tag))
            .ok_or_else(|| DeployError::missing("image.tag", "set IMAGE_TAG"))?;
        ImageRef::parse(name, tag)
    }

    pub fn require_docker_hub_username(&self) -> Result<&str, DeployError> {
        non_blank(self.docker_hub.username.as_ref())
            .ok_or_else(|| DeployError::missing("docker_hub.username", "set DOCKERHUB_USERNAME"))
    }

    /// Docker Hub access token, when provided through the environment
    pub fn docker_hub_token<F>(&self, lookup: F) -> Option<SecretString>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.docker_hub.token_env)
            .filter(|v| !v.trim().is_empty())
            .map(SecretString::from)
    }

    pub fn require_ecr_target(&self) -> Result<EcrTarget, DeployError> {
        let region = non_blank(Some(&self.ecr.region))
            .ok_or_else(|| DeployError::missing("ecr.region", "set AWS_REGION"))?;
        let account_id = non_blank(self.ecr.account_id.as_ref())
            .ok_or_else(|| DeployError::missing("ecr.account_id", "set AWS_ACCOUNT_ID"))?;
        let repository = non_blank(self.ecr.repository.as_ref())
            .ok_or_else(|| DeployError::missing("ecr.repository", "set ECR_REPOSITORY"))?;

        Ok(EcrTarget {
            region: region.to_string(),
            account_id: account_id.to_string(),
            repository: repository.to_string(),
        })
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}
