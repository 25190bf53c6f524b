//! Pipeline plans for each command

use secrecy::SecretString;

use crate::config::settings::Settings;
use crate::deploy::pipeline::{Pipeline, Step, StepAction};
use crate::deploy::readiness::WaitStrategy;
use crate::deploy::{compose, docker};
use crate::errors::DeployError;

/// Target registry for a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Registry {
    /// Docker Hub
    Hub,
    /// AWS Elastic Container Registry
    Ecr,
}

/// Options shared by the push plans
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Build the image before tagging it
    pub build: bool,

    /// Dockerfile variant for the build
    pub variant: Option<String>,

    /// Create the ECR repository if missing
    pub create_repository: bool,
}

/// Options for bringing the stack up
#[derive(Debug, Clone)]
pub struct UpOptions {
    pub build: bool,
    pub wait: WaitStrategy,
    pub create_schema: bool,
}

/// `build`: a single image build
pub fn build(settings: &Settings, variant: Option<&str>) -> Result<Pipeline, DeployError> {
    let image = settings.local_image()?;
    let dockerfile = settings.build.dockerfile(variant)?;

    Ok(Pipeline::new("build").step(Step::command(
        "build",
        docker::build(settings.engine, dockerfile, &image, &settings.build.context),
        "Image build failed. Check the Dockerfile and build context.",
    )))
}

/// `push-hub`: [build ->] login -> tag -> push
///
/// Without a token the login is interactive.
pub fn push_docker_hub(
    settings: &Settings,
    token: Option<SecretString>,
    options: &PushOptions,
) -> Result<Pipeline, DeployError> {
    let username = settings.require_docker_hub_username()?;
    let local = settings.local_image()?;
    let name = local
        .repository
        .rsplit('/')
        .next()
        .unwrap_or(&local.repository)
        .to_string();
    let remote = local.retarget(None, format!("{}/{}", username, name));

    let login = match token {
        Some(token) => docker::login_password_stdin(settings.engine, None, username, token),
        None => docker::login(settings.engine, None, username),
    };

    let mut pipeline = Pipeline::new("push-hub");
    if options.build {
        pipeline = pipeline.then(build(settings, options.variant.as_deref())?);
    }

    Ok(pipeline
        .step(Step::command(
            "login",
            login,
            "Docker Hub login failed. Check your username and access token.",
        ))
        .step(Step::command(
            "tag",
            docker::tag(settings.engine, &local, &remote),
            "Failed to tag image. Make sure it has been built.",
        ))
        .step(Step::command(
            "push",
            docker::push(settings.engine, &remote),
            "Failed to push image to Docker Hub.",
        )))
}

/// `push-ecr`: [build ->] login -> [ensure repository ->] tag -> push
pub fn push_ecr(settings: &Settings, options: &PushOptions) -> Result<Pipeline, DeployError> {
    let target = settings.require_ecr_target()?;
    let local = settings.local_image()?;
    let remote = target.image(&local);

    let mut pipeline = Pipeline::new("push-ecr");
    if options.build {
        pipeline = pipeline.then(build(settings, options.variant.as_deref())?);
    }

    pipeline = pipeline.step(Step::new(
        "login",
        StepAction::EcrLogin {
            engine: settings.engine,
            region: target.region.clone(),
            registry: target.registry(),
        },
        "ECR login failed. Check your AWS credentials, region and account ID.",
    ));

    if options.create_repository {
        pipeline = pipeline.step(Step::new(
            "ensure-repository",
            StepAction::EnsureEcrRepository {
                region: target.region.clone(),
                repository: target.repository.clone(),
            },
            "Failed to create ECR repository.",
        ));
    }

    Ok(pipeline
        .step(Step::command(
            "tag",
            docker::tag(settings.engine, &local, &remote),
            "Failed to tag image. Make sure it has been built.",
        ))
        .step(Step::command(
            "push",
            docker::push(settings.engine, &remote),
            "Failed to push image to ECR.",
        )))
}

/// `release`: build then push to the chosen registry
pub fn release(
    settings: &Settings,
    registry: Registry,
    token: Option<SecretString>,
    options: &PushOptions,
) -> Result<Pipeline, DeployError> {
    let options = PushOptions {
        build: true,
        ..options.clone()
    };
    let mut pipeline = match registry {
        Registry::Hub => push_docker_hub(settings, token, &options)?,
        Registry::Ecr => push_ecr(settings, &options)?,
    };
    pipeline.name = "release".to_string();
    Ok(pipeline)
}

/// `up`: compose up -> wait -> create schema
pub fn up(settings: &Settings, options: UpOptions) -> Result<Pipeline, DeployError> {
    let compose_settings = &settings.compose;

    let mut pipeline = Pipeline::new("up")
        .step(Step::new(
            "compose-up",
            StepAction::first_available(
                compose::version(settings.engine),
                compose::up(settings.engine, compose_settings, options.build),
            ),
            "Failed to start services with compose.",
        ))
        .step(Step::new(
            "wait",
            StepAction::Wait(options.wait),
            "Services did not become ready in time.",
        ));

    if options.create_schema {
        if compose_settings.schema_command.is_empty() {
            return Err(DeployError::missing(
                "compose.schema_command",
                "set it in the settings file or pass --skip-schema",
            ));
        }
        if compose_settings.app_service.trim().is_empty() {
            return Err(DeployError::missing("compose.app_service", "set APP_SERVICE"));
        }
        pipeline = pipeline.step(Step::new(
            "create-schema",
            StepAction::FollowFallback(compose::exec(
                settings.engine,
                compose_settings,
                &compose_settings.app_service,
                &compose_settings.schema_command,
            )),
            "Failed to create database tables.",
        ));
    }

    Ok(pipeline)
}

/// `down`: stop and remove the stack
pub fn down(settings: &Settings) -> Pipeline {
    Pipeline::new("down").step(Step::new(
        "compose-down",
        StepAction::first_available(
            compose::version(settings.engine),
            compose::down(settings.engine, &settings.compose),
        ),
        "Failed to stop services.",
    ))
}
