//! Executor tests against a recording runner

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bookdeploy::config::settings::Settings;
use bookdeploy::deploy::executor::{ExecutorOptions, PipelineExecutor};
use bookdeploy::deploy::fsm::RunState;
use bookdeploy::deploy::plan::{self, PushOptions, Registry, UpOptions};
use bookdeploy::deploy::readiness::{ReadinessProbe, WaitStrategy};
use bookdeploy::deploy::runner::DryRunRunner;
use bookdeploy::errors::DeployError;
use bookdeploy::filesys::file::File;
use bookdeploy::models::report::{PipelineReport, StepStatus};
use secrecy::SecretString;
use url::Url;

const ECR_HOST: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com";

struct StaticProbe(bool);

#[async_trait]
impl ReadinessProbe for StaticProbe {
    async fn check(&self, _url: &Url) -> Result<bool, DeployError> {
        Ok(self.0)
    }
}

fn executor(runner: Arc<DryRunRunner>, ready: bool) -> PipelineExecutor {
    PipelineExecutor::new(runner, Arc::new(StaticProbe(ready)), ExecutorOptions::default())
}

fn ecr_settings() -> Settings {
    let mut settings = Settings::default();
    settings.ecr.account_id = Some("123456789012".to_string());
    settings.ecr.repository = Some("books".to_string());
    settings
}

fn hub_settings() -> Settings {
    let mut settings = Settings::default();
    settings.docker_hub.username = Some("jdoe".to_string());
    settings
}

#[tokio::test]
async fn test_release_to_ecr_runs_commands_in_order() {
    let runner = Arc::new(DryRunRunner::new());
    let pipeline = plan::release(&ecr_settings(), Registry::Ecr, None, &PushOptions::default()).unwrap();

    let report = executor(runner.clone(), true).run(&pipeline).await.unwrap();

    assert!(report.succeeded());
    assert!(report.check().is_ok());
    assert!(report.steps.iter().all(|s| s.status == StepStatus::Succeeded));
    assert_eq!(
        runner.recorded().await,
        vec![
            "docker build -f Dockerfile -t book-management-agent:latest .".to_string(),
            "aws ecr get-login-password --region us-east-1".to_string(),
            format!("docker login --username AWS --password-stdin {}", ECR_HOST),
            format!("docker tag book-management-agent:latest {}/books:latest", ECR_HOST),
            format!("docker push {}/books:latest", ECR_HOST),
        ]
    );
}

#[tokio::test]
async fn test_failed_login_stops_pipeline() {
    let runner = Arc::new(DryRunRunner::new().fail_on("docker login"));
    let pipeline = plan::push_docker_hub(&hub_settings(), None, &PushOptions::default()).unwrap();

    let executor = executor(runner.clone(), true);
    let report = executor.run(&pipeline).await.unwrap();

    // Nothing after the failing login is invoked
    assert_eq!(runner.recorded().await, vec!["docker login --username jdoe"]);
    assert_eq!(executor.state().await, RunState::Failed);
    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.step("login").unwrap().status, StepStatus::Failed);
    assert_eq!(report.step("tag").unwrap().status, StepStatus::Skipped);
    assert_eq!(report.step("push").unwrap().status, StepStatus::Skipped);

    match report.check() {
        Err(DeployError::StepFailed { step, message }) => {
            assert_eq!(step, "login");
            assert_eq!(
                message,
                "Docker Hub login failed. Check your username and access token."
            );
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_build_failure_skips_push() {
    let runner = Arc::new(DryRunRunner::new().fail_on("docker build"));
    let pipeline = plan::release(&ecr_settings(), Registry::Ecr, None, &PushOptions::default()).unwrap();

    let report = executor(runner.clone(), true).run(&pipeline).await.unwrap();

    assert_eq!(runner.recorded().await.len(), 1);
    assert_eq!(report.failure.as_ref().unwrap().step, "build");
    assert_eq!(
        report.steps.iter().filter(|s| s.status == StepStatus::Skipped).count(),
        3
    );
}

#[tokio::test]
async fn test_missing_engine_binary_fails_step() {
    let runner = Arc::new(DryRunRunner::new().missing_program("docker"));
    let pipeline = plan::build(&Settings::default(), None).unwrap();

    let report = executor(runner, true).run(&pipeline).await.unwrap();
    let step = report.step("build").unwrap();
    assert_eq!(step.status, StepStatus::Failed);
    assert!(step.error.as_deref().unwrap().contains("Failed to start 'docker'"));
}

#[tokio::test]
async fn test_up_falls_back_to_legacy_compose_for_every_call() {
    let runner = Arc::new(DryRunRunner::new().fail_on("docker compose"));
    let settings = Settings::default();
    let pipeline = plan::up(
        &settings,
        UpOptions {
            build: true,
            wait: WaitStrategy::Fixed {
                delay: Duration::ZERO,
            },
            create_schema: true,
        },
    )
    .unwrap();

    let report = executor(runner.clone(), true).run(&pipeline).await.unwrap();
    assert!(report.succeeded());

    let recorded = runner.recorded().await;
    assert_eq!(recorded.len(), 4);
    assert_eq!(recorded[0], "docker compose version");
    assert_eq!(recorded[1], "docker-compose version");
    assert_eq!(recorded[2], "docker-compose -f docker-compose.yml up -d --build");
    assert!(recorded[3].starts_with("docker-compose -f docker-compose.yml exec -T app python -c"));
}

#[tokio::test]
async fn test_failed_compose_up_is_not_rerun_with_legacy_compose() {
    let runner = Arc::new(
        DryRunRunner::new()
            .fail_on("up -d")
            .missing_program("docker-compose"),
    );
    let pipeline = plan::up(
        &Settings::default(),
        UpOptions {
            build: true,
            wait: WaitStrategy::Fixed {
                delay: Duration::ZERO,
            },
            create_schema: true,
        },
    )
    .unwrap();

    let report = executor(runner.clone(), true).run(&pipeline).await.unwrap();

    let ups: Vec<String> = runner
        .recorded()
        .await
        .into_iter()
        .filter(|c| c.contains("up -d"))
        .collect();
    assert_eq!(ups, vec!["docker compose -f docker-compose.yml up -d --build"]);

    let step = report.step("compose-up").unwrap();
    assert_eq!(step.status, StepStatus::Failed);
    assert_eq!(
        step.error.as_deref(),
        Some("'docker compose -f docker-compose.yml up -d --build' failed with exit status 1")
    );
    assert_eq!(report.step("create-schema").unwrap().status, StepStatus::Skipped);
}

#[tokio::test]
async fn test_no_compose_installed_fails_compose_up() {
    let runner = Arc::new(
        DryRunRunner::new()
            .fail_on("docker compose")
            .missing_program("docker-compose"),
    );
    let pipeline = plan::down(&Settings::default());

    let report = executor(runner.clone(), true).run(&pipeline).await.unwrap();

    assert_eq!(
        runner.recorded().await,
        vec!["docker compose version", "docker-compose version"]
    );
    assert_eq!(report.failure.unwrap().message, "Failed to stop services.");
}

#[tokio::test]
async fn test_schema_failure_is_not_retried_with_other_compose() {
    let runner = Arc::new(DryRunRunner::new().fail_on("exec -T"));
    let pipeline = plan::up(
        &Settings::default(),
        UpOptions {
            build: false,
            wait: WaitStrategy::Fixed {
                delay: Duration::ZERO,
            },
            create_schema: true,
        },
    )
    .unwrap();

    let report = executor(runner.clone(), true).run(&pipeline).await.unwrap();
    assert_eq!(report.failure.unwrap().message, "Failed to create database tables.");
    let recorded = runner.recorded().await;
    assert_eq!(recorded.len(), 3);
    assert_eq!(recorded.iter().filter(|c| c.contains("exec -T")).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_health_timeout_skips_schema() {
    let runner = Arc::new(DryRunRunner::new());
    let pipeline = plan::up(
        &Settings::default(),
        UpOptions {
            build: true,
            wait: WaitStrategy::Health {
                url: Url::parse("http://localhost:8000/health").unwrap(),
                timeout: Duration::from_secs(10),
                interval: Duration::from_secs(1),
            },
            create_schema: true,
        },
    )
    .unwrap();

    let report = executor(runner.clone(), false).run(&pipeline).await.unwrap();

    assert_eq!(report.step("wait").unwrap().status, StepStatus::Failed);
    assert_eq!(report.step("create-schema").unwrap().status, StepStatus::Skipped);
    assert_eq!(
        runner.recorded().await,
        vec![
            "docker compose version",
            "docker compose -f docker-compose.yml up -d --build",
        ]
    );
}

#[tokio::test]
async fn test_dry_run_skips_wait() {
    let runner = Arc::new(DryRunRunner::new());
    let pipeline = plan::up(
        &Settings::default(),
        UpOptions {
            build: true,
            wait: WaitStrategy::Fixed {
                delay: Duration::from_secs(3600),
            },
            create_schema: false,
        },
    )
    .unwrap();

    let executor = PipelineExecutor::new(
        runner,
        Arc::new(StaticProbe(false)),
        ExecutorOptions { dry_run: true },
    );
    let report = tokio::time::timeout(Duration::from_secs(5), executor.run(&pipeline))
        .await
        .expect("dry run does not sleep")
        .unwrap();
    assert!(report.succeeded());
    assert!(report.dry_run);
}

#[tokio::test]
async fn test_report_never_contains_secrets() {
    let runner = Arc::new(DryRunRunner::new());
    let token = SecretString::from("s3cr3t-token");
    let pipeline = plan::push_docker_hub(&hub_settings(), Some(token), &PushOptions::default()).unwrap();

    let report = executor(runner.clone(), true).run(&pipeline).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("report.json"));
    file.write_json(&report).await.unwrap();
    let contents = file.read_string().await.unwrap();
    assert!(!contents.contains("s3cr3t-token"));
    assert!(runner.recorded().await.iter().all(|c| !c.contains("s3cr3t-token")));

    let parsed: PipelineReport = file.read_json().await.unwrap();
    assert_eq!(parsed.run_id, report.run_id);
    assert_eq!(parsed.state, RunState::Succeeded);
}

#[tokio::test]
async fn test_executor_can_run_again_after_failure() {
    let failing = Arc::new(DryRunRunner::new().fail_on("docker build"));
    let executor = executor(failing, true);
    let pipeline = plan::build(&Settings::default(), None).unwrap();

    let first = executor.run(&pipeline).await.unwrap();
    assert_eq!(first.state, RunState::Failed);

    let second = executor.run(&pipeline).await.unwrap();
    assert_eq!(second.state, RunState::Failed);
    assert_ne!(first.run_id, second.run_id);
}
