//! Plan unit tests

use std::path::PathBuf;
use std::time::Duration;

use bookdeploy::app::cli::Cli;
use bookdeploy::app::run::plan_command;
use bookdeploy::config::settings::Settings;
use bookdeploy::deploy::pipeline::{Pipeline, StepAction};
use bookdeploy::deploy::readiness::WaitStrategy;
use bookdeploy::errors::DeployError;
use clap::Parser;

const ECR_HOST: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com";

fn no_env(_: &str) -> Option<String> {
    None
}

fn plan(args: &[&str], settings: &mut Settings) -> Result<Pipeline, DeployError> {
    plan_with_env(args, settings, no_env)
}

fn plan_with_env<F>(args: &[&str], settings: &mut Settings, env: F) -> Result<Pipeline, DeployError>
where
    F: Fn(&str) -> Option<String>,
{
    let argv = std::iter::once("bookdeploy").chain(args.iter().copied());
    let cli = Cli::try_parse_from(argv).unwrap();
    Ok(plan_command(&cli.command, settings, env)?.expect("command has a pipeline"))
}

fn described(pipeline: &Pipeline) -> Vec<String> {
    pipeline.steps.iter().map(|s| s.action.describe()).collect()
}

#[test]
fn test_build_uses_default_dockerfile() {
    let mut settings = Settings::default();
    let pipeline = plan(&["build"], &mut settings).unwrap();

    assert_eq!(pipeline.step_names(), ["build"]);
    assert_eq!(
        described(&pipeline),
        ["docker build -f Dockerfile -t book-management-agent:latest ."]
    );
}

#[test]
fn test_build_variant_and_tag() {
    let mut settings = Settings::default();
    settings
        .build
        .dockerfiles
        .insert("minimal".to_string(), PathBuf::from("Dockerfile.minimal"));

    let pipeline = plan(&["build", "--variant", "minimal", "--tag", "v2"], &mut settings).unwrap();
    assert_eq!(
        described(&pipeline),
        ["docker build -f Dockerfile.minimal -t book-management-agent:v2 ."]
    );
}

#[test]
fn test_build_unknown_variant_fails() {
    let mut settings = Settings::default();
    let result = plan(&["build", "--variant", "gpu"], &mut settings);
    assert!(matches!(result, Err(DeployError::ConfigError(_))));
}

#[test]
fn test_push_hub_requires_username() {
    let mut settings = Settings::default();
    match plan(&["push-hub"], &mut settings) {
        Err(DeployError::MissingParameter { name, hint }) => {
            assert_eq!(name, "docker_hub.username");
            assert!(hint.contains("DOCKERHUB_USERNAME"));
        }
        other => panic!("unexpected: {:?}", other.map(|p| p.step_names().join(","))),
    }
}

#[test]
fn test_push_hub_with_token_logs_in_non_interactively() {
    let mut settings = Settings::default();
    let pipeline = plan_with_env(
        &["push-hub", "--username", "jdoe"],
        &mut settings,
        |key| (key == "DOCKERHUB_TOKEN").then(|| "s3cr3t-token".to_string()),
    )
    .unwrap();

    assert_eq!(pipeline.step_names(), ["login", "tag", "push"]);
    assert_eq!(
        described(&pipeline),
        [
            "docker login --username jdoe --password-stdin",
            "docker tag book-management-agent:latest jdoe/book-management-agent:latest",
            "docker push jdoe/book-management-agent:latest",
        ]
    );
    match &pipeline.steps[0].action {
        StepAction::Command(spec) => assert!(spec.stdin.is_some()),
        other => panic!("unexpected action: {:?}", other),
    }
}

#[test]
fn test_push_hub_without_token_is_interactive() {
    let mut settings = Settings::default();
    settings.docker_hub.username = Some("jdoe".to_string());

    let pipeline = plan(&["push-hub", "--build"], &mut settings).unwrap();
    assert_eq!(pipeline.step_names(), ["build", "login", "tag", "push"]);
    assert_eq!(described(&pipeline)[1], "docker login --username jdoe");
}

#[test]
fn test_push_ecr_reports_missing_account() {
    let mut settings = Settings::default();
    match plan(&["push-ecr", "--repository", "books"], &mut settings) {
        Err(DeployError::MissingParameter { name, .. }) => assert_eq!(name, "ecr.account_id"),
        other => panic!("unexpected: {:?}", other.map(|p| p.step_names().join(","))),
    }
}

#[test]
fn test_push_ecr_commands() {
    let mut settings = Settings::default();
    let pipeline = plan(
        &[
            "push-ecr",
            "--account-id",
            "123456789012",
            "--repository",
            "books",
            "--tag",
            "1.4.0",
        ],
        &mut settings,
    )
    .unwrap();

    assert_eq!(pipeline.name, "push-ecr");
    assert_eq!(
        described(&pipeline),
        [
            format!(
                "aws ecr get-login-password --region us-east-1 | docker login --username AWS --password-stdin {}",
                ECR_HOST
            ),
            format!(
                "docker tag book-management-agent:1.4.0 {}/books:1.4.0",
                ECR_HOST
            ),
            format!("docker push {}/books:1.4.0", ECR_HOST),
        ]
    );
}

#[test]
fn test_release_to_ecr_builds_and_bootstraps_repository() {
    let mut settings = Settings::default();
    settings.ecr.account_id = Some("123456789012".to_string());
    settings.ecr.repository = Some("books".to_string());

    let pipeline = plan(
        &["release", "--registry", "ecr", "--create-repository"],
        &mut settings,
    )
    .unwrap();

    assert_eq!(pipeline.name, "release");
    assert_eq!(
        pipeline.step_names(),
        ["build", "login", "ensure-repository", "tag", "push"]
    );
}

#[test]
fn test_up_defaults_to_fixed_wait_and_schema() {
    let mut settings = Settings::default();
    let pipeline = plan(&["up"], &mut settings).unwrap();

    assert_eq!(pipeline.step_names(), ["compose-up", "wait", "create-schema"]);
    match &pipeline.steps[1].action {
        StepAction::Wait(WaitStrategy::Fixed { delay }) => {
            assert_eq!(*delay, Duration::from_secs(10))
        }
        other => panic!("unexpected action: {:?}", other),
    }
    assert!(described(&pipeline)[0].starts_with("docker compose -f docker-compose.yml up -d --build"));
}

#[test]
fn test_up_with_health_wait_and_no_schema() {
    let mut settings = Settings::default();
    let pipeline = plan(
        &[
            "up",
            "--no-build",
            "--wait",
            "health",
            "--health-url",
            "http://localhost:8080/health",
            "--timeout-secs",
            "30",
            "--skip-schema",
        ],
        &mut settings,
    )
    .unwrap();

    assert_eq!(pipeline.step_names(), ["compose-up", "wait"]);
    assert_eq!(
        described(&pipeline),
        [
            "docker compose -f docker-compose.yml up -d || docker-compose -f docker-compose.yml up -d",
            "poll http://localhost:8080/health for up to 30s",
        ]
    );
}

#[test]
fn test_up_rejects_bad_health_url() {
    let mut settings = Settings::default();
    let result = plan(&["up", "--wait", "health", "--health-url", "localhost"], &mut settings);
    assert!(matches!(result, Err(DeployError::ConfigError(_))));
}

#[test]
fn test_up_with_empty_schema_command_fails() {
    let mut settings = Settings::default();
    settings.compose.schema_command.clear();
    assert!(matches!(
        plan(&["up"], &mut settings),
        Err(DeployError::MissingParameter { .. })
    ));
}
