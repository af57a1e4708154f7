// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use sw_config::ShipwrightConfig;
use sw_core::{
    lock_path, ErrorKind, Pipeline, PipelineConfig, PipelineHosts, PipelineStep, RunLock,
    ServiceAction, StepOutcome,
};
use sw_credentials::Credential;
use sw_domain_types::{DeployStatus, PublishResult, RollbackResult, RollbackUnsupportedReason};
use sw_rest_client::{RemoteDeployStatus, RetryPolicy, StatusCode};
use sw_rest_mock_client::{DeployState, FakeDeployHost, FakeSourceHost, SourceState};

const LOGIN: &str = "octo";

fn check_git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(["-c", "user.name=Test User", "-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Project directory, bare remote and pipeline configuration for one test
struct Project {
    remotes: TempDir,
    dir: TempDir,
    name: String,
}

impl Project {
    fn new() -> Self {
        let remotes = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        let name = dir
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .trim_start_matches('.')
            .to_string();
        let project = Self { remotes, dir, name };
        if check_git_available() {
            let bare = project.bare();
            fs::create_dir_all(&bare).unwrap();
            git(&bare, &["init", "--bare", "--quiet"]);
        }
        fs::write(project.dir.path().join("app.py"), "print('hello')\n").unwrap();
        project
    }

    fn bare(&self) -> PathBuf {
        self.remotes.path().join(LOGIN).join(format!("{}.git", self.name))
    }

    fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", LOGIN, self.name)
    }

    fn source_state(&self) -> SourceState {
        SourceState::new(LOGIN).with_clone_base(&self.remotes.path().to_string_lossy())
    }

    fn config(&self) -> PipelineConfig {
        let mut settings = ShipwrightConfig::default();
        settings.repository.name = Some(self.name.clone());
        let mut config = PipelineConfig::from_config(&settings, self.dir.path().to_path_buf()).unwrap();
        config.poll_interval = Duration::from_millis(1);
        config.timeout = Duration::from_secs(30);
        config.retry = RetryPolicy::fixed(3, Duration::from_millis(1));
        config
    }

    /// Commit the project and push it, so the tree is clean and up to date
    fn push_initial_commit(&self) {
        let dir = self.dir.path();
        git(dir, &["init", "--quiet"]);
        git(dir, &["add", "--all"]);
        git(dir, &["commit", "--quiet", "-m", "initial"]);
        git(dir, &["branch", "-M", "main"]);
        git(dir, &["remote", "add", "origin", &self.bare().to_string_lossy()]);
        git(dir, &["push", "--quiet", "-u", "origin", "main"]);
    }
}

fn pipeline(source: &FakeSourceHost, deploy: &FakeDeployHost) -> Pipeline {
    Pipeline::new(
        PipelineHosts {
            source: Arc::new(source.clone()),
            deploy: Arc::new(deploy.clone()),
        },
        Credential::source_control("ghp_validtoken0000"),
        Credential::deploy("rnd_validkey0000"),
    )
}

#[tokio::test]
async fn test_fresh_project_goes_live() {
    if !check_git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let project = Project::new();
    let source = FakeSourceHost::from_state(project.source_state());
    let deploy = FakeDeployHost::new();

    let report = pipeline(&source, &deploy).run(&project.config()).await;

    assert!(report.succeeded(), "{:?}", report.error);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(source.call_count("create_repository").await, 1);

    let commit = match report.publish.clone().unwrap() {
        PublishResult::Published { commit, .. } => commit,
        other => panic!("unexpected publish result: {other:?}"),
    };
    assert_eq!(git(&project.bare(), &["rev-parse", "refs/heads/main"]), commit);

    let service = report.service.clone().unwrap();
    assert_eq!(service.action, ServiceAction::Created);
    assert_eq!(service.descriptor.repository_ref.as_deref(), Some(project.html_url().as_str()));

    assert_eq!(report.deploy.as_ref().unwrap().status, DeployStatus::Live);
    assert_eq!(
        report.live_url.as_deref(),
        Some(format!("https://{}.onrender.com", project.name).as_str())
    );
    assert!(matches!(
        report.outcome(PipelineStep::Rollback),
        Some(StepOutcome::Skipped { .. })
    ));
    assert_eq!(deploy.call_count("rollback").await, 0);
}

#[tokio::test]
async fn test_local_secret_file_is_kept_out_of_the_push() {
    if !check_git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let project = Project::new();
    fs::write(project.dir.path().join(".env"), "SECRET_KEY=hunter2\n").unwrap();
    let source = FakeSourceHost::from_state(project.source_state());
    let deploy = FakeDeployHost::new();

    let report = pipeline(&source, &deploy).run(&project.config()).await;

    assert!(report.succeeded(), "{:?}", report.error);
    let tree = git(&project.bare(), &["ls-tree", "--name-only", "refs/heads/main"]);
    assert!(tree.lines().any(|l| l == "app.py"));
    assert!(tree.lines().any(|l| l == ".gitignore"));
    assert!(!tree.lines().any(|l| l == ".env"));
    assert!(project.dir.path().join(".env").exists());
}

#[tokio::test]
async fn test_second_run_updates_instead_of_creating() {
    if !check_git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let project = Project::new();
    let source = FakeSourceHost::from_state(project.source_state());
    let deploy = FakeDeployHost::new();
    let pipeline = pipeline(&source, &deploy);

    let first = pipeline.run(&project.config()).await;
    assert!(first.succeeded(), "{:?}", first.error);
    let second = pipeline.run(&project.config()).await;
    assert!(second.succeeded(), "{:?}", second.error);

    assert_eq!(second.publish, Some(PublishResult::NoOp));
    assert_eq!(second.repository, first.repository);
    assert_eq!(second.service.unwrap().action, ServiceAction::Updated);
    assert_eq!(deploy.call_count("create_service").await, 1);
    assert_eq!(deploy.services().await.len(), 1);
}

#[tokio::test]
async fn test_failed_trigger_rolls_back_once() {
    if !check_git_available() {
        eprintln!("Git not available, skipping test");
        return;
    }
    let project = Project::new();
    project.push_initial_commit();
    let pushed = git(&project.bare(), &["rev-parse", "refs/heads/main"]);

    let source = FakeSourceHost::from_state(project.source_state().with_repository(&project.name));
    let deploy = FakeDeployHost::from_state(
        DeployState::default()
            .with_service(&project.name, &project.html_url(), "main")
            .with_past_deploy(RemoteDeployStatus::Live)
            .failing("trigger_deploy", StatusCode::BAD_REQUEST, 1),
    );
    let existing = deploy.services().await[0].id.clone();

    let report = pipeline(&source, &deploy).run(&project.config()).await;

    assert_eq!(report.publish, Some(PublishResult::NoOp));
    assert_eq!(git(&project.bare(), &["rev-parse", "refs/heads/main"]), pushed);

    let service = report.service.clone().unwrap();
    assert_eq!(service.action, ServiceAction::Updated);
    assert_eq!(service.descriptor.id, existing);
    assert_eq!(deploy.call_count("create_service").await, 0);
    assert_eq!(deploy.call_count("update_service").await, 1);

    let record = report.deploy.clone().unwrap();
    assert_eq!(record.status, DeployStatus::Failed);
    assert!(record.id.is_none());

    assert_eq!(deploy.call_count("trigger_deploy").await, 1);
    assert_eq!(deploy.call_count("rollback").await, 1);
    assert!(matches!(report.rollback, Some(RollbackResult::RolledBack { .. })));
    assert!(matches!(
        report.outcome(PipelineStep::AwaitDeploy),
        Some(StepOutcome::Skipped { .. })
    ));

    let error = report.error.clone().unwrap();
    assert_eq!(error.step, PipelineStep::TriggerDeploy);
    assert_eq!(error.kind, ErrorKind::DeployFailed);
    assert_eq!(report.exit_code(), 15);
}

#[tokio::test]
async fn test_rollback_failure_is_distinct_from_deploy_failure() {
    let project = Project::new();
    let source = FakeSourceHost::from_state(project.source_state());
    let deploy = FakeDeployHost::from_state(
        DeployState::default()
            .with_service(&project.name, &project.html_url(), "main")
            .with_past_deploy(RemoteDeployStatus::Live)
            .with_deploy_script(vec![RemoteDeployStatus::BuildFailed])
            .failing("rollback", StatusCode::INTERNAL_SERVER_ERROR, 1),
    );
    let mut config = project.config();
    config.skip_publish = true;

    let report = pipeline(&source, &deploy).run(&config).await;

    assert!(matches!(
        report.outcome(PipelineStep::AwaitDeploy),
        Some(StepOutcome::Failed { kind: ErrorKind::DeployFailed, .. })
    ));
    let error = report.error.clone().unwrap();
    assert_eq!(error.kind, ErrorKind::RollbackFailed);
    assert_eq!(report.exit_code(), 17);
    assert_eq!(deploy.call_count("rollback").await, 1);
}

#[tokio::test]
async fn test_build_failure_with_rollback_reports_deploy_failed() {
    let project = Project::new();
    let source = FakeSourceHost::from_state(project.source_state());
    let deploy = FakeDeployHost::from_state(
        DeployState::default()
            .with_service(&project.name, &project.html_url(), "main")
            .with_past_deploy(RemoteDeployStatus::Live)
            .with_deploy_script(vec![
                RemoteDeployStatus::BuildInProgress,
                RemoteDeployStatus::BuildFailed,
            ]),
    );
    let mut config = project.config();
    config.skip_publish = true;

    let report = pipeline(&source, &deploy).run(&config).await;

    assert_eq!(report.outcome(PipelineStep::Rollback), Some(&StepOutcome::Succeeded));
    assert_eq!(report.error.as_ref().unwrap().kind, ErrorKind::DeployFailed);
    assert_eq!(report.exit_code(), 16);
}

#[tokio::test]
async fn test_build_failure_with_rollback_disabled_is_still_deploy_failed() {
    let project = Project::new();
    let source = FakeSourceHost::from_state(project.source_state());
    let deploy = FakeDeployHost::from_state(
        DeployState::default()
            .with_service(&project.name, &project.html_url(), "main")
            .with_past_deploy(RemoteDeployStatus::Live)
            .with_deploy_script(vec![RemoteDeployStatus::BuildFailed]),
    );
    let mut config = project.config();
    config.skip_publish = true;
    config.rollback_on_failure = false;

    let report = pipeline(&source, &deploy).run(&config).await;

    assert!(matches!(
        report.outcome(PipelineStep::Rollback),
        Some(StepOutcome::Skipped { .. })
    ));
    assert_eq!(report.exit_code(), 16);
    assert_eq!(deploy.call_count("rollback").await, 0);
}

#[tokio::test]
async fn test_rollback_unsupported_without_prior_success() {
    let project = Project::new();
    let source = FakeSourceHost::from_state(project.source_state());
    let deploy = FakeDeployHost::from_state(
        DeployState::default()
            .with_service(&project.name, &project.html_url(), "main")
            .with_deploy_script(vec![RemoteDeployStatus::BuildFailed]),
    );
    let mut config = project.config();
    config.skip_publish = true;

    let report = pipeline(&source, &deploy).run(&config).await;

    assert_eq!(
        report.rollback,
        Some(RollbackResult::Unsupported {
            reason: RollbackUnsupportedReason::NoPriorSuccessfulDeploy
        })
    );
    assert_eq!(report.exit_code(), 18);
    assert_eq!(deploy.call_count("rollback").await, 0);
}

#[tokio::test]
async fn test_rejected_credential_stops_before_any_mutation() {
    let project = Project::new();
    let source = FakeSourceHost::from_state(project.source_state().rejecting_credentials());
    let deploy = FakeDeployHost::new();

    let report = pipeline(&source, &deploy).run(&project.config()).await;

    assert_eq!(report.exit_code(), 10);
    assert_eq!(report.error.as_ref().unwrap().kind, ErrorKind::Auth);
    assert_eq!(source.call_count("current_user").await, 1);
    assert_eq!(source.call_count("create_repository").await, 0);
    assert!(deploy.calls().await.is_empty());
    assert!(!project.dir.path().join(".git").exists());
    for step in &PipelineStep::ALL[1..] {
        assert!(
            matches!(report.outcome(*step), Some(StepOutcome::Skipped { .. })),
            "{step} was not skipped"
        );
    }
}

#[tokio::test]
async fn test_rejected_deploy_key_stops_before_any_mutation() {
    let project = Project::new();
    let source = FakeSourceHost::from_state(project.source_state());
    let deploy = FakeDeployHost::from_state(DeployState::default().rejecting_credentials());

    let report = pipeline(&source, &deploy).run(&project.config()).await;

    assert_eq!(report.exit_code(), 10);
    assert_eq!(source.call_count("create_repository").await, 0);
}

#[tokio::test]
async fn test_held_lock_aborts_run() {
    let project = Project::new();
    let config = project.config();
    let _held = RunLock::acquire(lock_path(&config.repository_name, &config.service_name)).unwrap();

    let source = FakeSourceHost::from_state(project.source_state());
    let deploy = FakeDeployHost::new();
    let report = pipeline(&source, &deploy).run(&config).await;

    if cfg!(unix) {
        assert_eq!(report.exit_code(), 20);
        assert_eq!(source.call_count("create_repository").await, 0);
    }
}

#[tokio::test]
async fn test_no_wait_skips_polling() {
    let project = Project::new();
    let source = FakeSourceHost::from_state(project.source_state());
    let deploy = FakeDeployHost::new();
    let mut config = project.config();
    config.skip_publish = true;
    config.wait = false;

    let report = pipeline(&source, &deploy).run(&config).await;

    assert!(report.succeeded(), "{:?}", report.error);
    assert_eq!(report.deploy.as_ref().unwrap().status, DeployStatus::Pending);
    assert_eq!(deploy.call_count("get_deploy").await, 0);
    assert!(matches!(
        report.outcome(PipelineStep::LinkWorkingCopy),
        Some(StepOutcome::Skipped { .. })
    ));
}
