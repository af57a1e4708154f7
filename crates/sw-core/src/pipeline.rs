// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The deploy pipeline: validate, publish, provision, deploy, roll back
//!
//! Every step is awaited before the next one starts. Each step runs inside a
//! `pipeline_step` span and ends up in the [`RunReport`] as succeeded, failed
//! or skipped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sw_config::{ShipwrightConfig, WaitKind};
use sw_credentials::{validate, validate_deploy_key, Credential};
use sw_domain_types::{
    DeployRecord, DeployStatus, Identity, PublishResult, RepositoryDescriptor, RollbackResult,
    ServiceSpec,
};
use sw_logging::TracingExt;
use sw_repo::{GitAuth, RepositorySynchronizer, SyncOptions, WorkingCopy};
use sw_rest_client::{DeployHost, RetryPolicy, SourceHost, WaitStrategy};
use tracing::Instrument;

use crate::deploy::DeployController;
use crate::error::{CoreError, ErrorKind, PipelineError, PipelineStep};
use crate::lock::{lock_path, RunLock};
use crate::registry::{EnsuredService, ServiceRegistry};

/// Everything one run needs to know, resolved from configuration and flags
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub project_root: PathBuf,
    pub repository_name: String,
    pub private: bool,
    pub description: Option<String>,
    pub branch: String,
    pub commit_message: String,
    pub service_name: String,
    /// Recorded service id, tried before the name lookup
    pub service_id: Option<String>,
    pub owner_id: Option<String>,
    pub plan: String,
    pub region: String,
    pub runtime: String,
    pub build_command: String,
    pub start_command: String,
    pub auto_deploy: bool,
    pub secret_patterns: Vec<String>,
    pub git_user_name: String,
    pub git_user_email: String,
    /// Poll the deploy until it is live or failed
    pub wait: bool,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub rollback_on_failure: bool,
    /// Skip linking and publishing; only redeploy what the remote has
    pub skip_publish: bool,
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    /// Resolve a run configuration for the project at `project_root`
    ///
    /// The repository name defaults to the project directory name and the
    /// service name to the repository name.
    pub fn from_config(config: &ShipwrightConfig, project_root: PathBuf) -> Result<Self, CoreError> {
        let repository_name = match &config.repository.name {
            Some(name) => name.clone(),
            None => project_root
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    CoreError::Config(format!(
                        "cannot derive a repository name from {}; set repository.name",
                        project_root.display()
                    ))
                })?,
        };
        if repository_name.trim().is_empty() {
            return Err(CoreError::Config("repository.name must not be empty".to_string()));
        }
        if config.deploy.poll_interval_secs == 0 {
            return Err(CoreError::Config("deploy.poll-interval-secs must be positive".to_string()));
        }

        let service = &config.service;
        Ok(Self {
            service_name: service.name.clone().unwrap_or_else(|| repository_name.clone()),
            repository_name,
            project_root,
            private: config.repository.private,
            description: config.repository.description.clone(),
            branch: config.repository.branch.clone(),
            commit_message: config.repository.commit_message.clone(),
            service_id: service.id.clone(),
            owner_id: service.owner_id.clone(),
            plan: service.plan.clone(),
            region: service.region.clone(),
            runtime: service.runtime.as_str().to_string(),
            build_command: service.build_command.clone(),
            start_command: service.start_command.clone(),
            auto_deploy: service.auto_deploy,
            secret_patterns: config.git.secret_patterns.clone(),
            git_user_name: config.git.user_name.clone(),
            git_user_email: config.git.user_email.clone(),
            wait: config.deploy.wait,
            poll_interval: Duration::from_secs(config.deploy.poll_interval_secs),
            timeout: Duration::from_secs(config.deploy.timeout_secs),
            rollback_on_failure: config.deploy.rollback,
            skip_publish: false,
            retry: retry_policy(config),
        })
    }

    pub fn service_spec(&self, repository_ref: &str) -> ServiceSpec {
        ServiceSpec {
            name: self.service_name.clone(),
            repository_ref: repository_ref.to_string(),
            branch: self.branch.clone(),
            build_command: self.build_command.clone(),
            start_command: self.start_command.clone(),
            plan: self.plan.clone(),
            region: self.region.clone(),
            runtime: self.runtime.clone(),
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            branch: self.branch.clone(),
            secret_patterns: self.secret_patterns.clone(),
            user_name: self.git_user_name.clone(),
            user_email: self.git_user_email.clone(),
            private: self.private,
            description: self.description.clone(),
            retry: self.retry.clone(),
        }
    }
}

/// Retry policy described by the `retry` section
pub fn retry_policy(config: &ShipwrightConfig) -> RetryPolicy {
    let retry = &config.retry;
    let initial_delay = Duration::from_millis(retry.initial_delay_ms);
    RetryPolicy {
        max_attempts: retry.max_attempts,
        wait: match retry.wait {
            WaitKind::Fixed => WaitStrategy::Fixed {
                delay: initial_delay,
            },
            WaitKind::Exponential => WaitStrategy::Exponential {
                initial_delay,
                multiplier: retry.multiplier,
                max_delay: Duration::from_millis(retry.max_delay_ms),
            },
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum StepOutcome {
    Succeeded,
    Failed { kind: ErrorKind, message: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step: PipelineStep,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// What a run did, step by step
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    pub identity: Option<Identity>,
    pub repository: Option<RepositoryDescriptor>,
    pub publish: Option<PublishResult>,
    pub service: Option<EnsuredService>,
    pub deploy: Option<DeployRecord>,
    pub rollback: Option<RollbackResult>,
    pub live_url: Option<String>,
    /// The failure that decides the exit status
    pub error: Option<PipelineError>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        self.error.as_ref().map_or(0, PipelineError::exit_code)
    }

    pub fn outcome(&self, step: PipelineStep) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.outcome)
    }

    fn push(&mut self, step: PipelineStep, outcome: StepOutcome) {
        self.steps.push(StepReport { step, outcome });
    }

    fn succeed(&mut self, step: PipelineStep) {
        self.push(step, StepOutcome::Succeeded);
    }

    fn fail(&mut self, err: PipelineError) {
        tracing::error!(step = %err.step, kind = %err.kind, "{}", err.message);
        self.push(
            err.step,
            StepOutcome::Failed {
                kind: err.kind,
                message: err.message.clone(),
            },
        );
        self.error = Some(err);
    }

    fn skip(&mut self, step: PipelineStep, reason: &str) {
        self.push(
            step,
            StepOutcome::Skipped {
                reason: reason.to_string(),
            },
        );
    }

    /// Mark every step without an outcome as skipped
    fn skip_remaining(&mut self, reason: &str) {
        for step in PipelineStep::ALL {
            if self.outcome(step).is_none() {
                self.skip(step, reason);
            }
        }
    }

    /// Fail `err.step` and skip everything after it
    fn abort(mut self, err: PipelineError) -> Self {
        let reason = format!("{} failed", err.step);
        self.fail(err);
        self.skip_remaining(&reason);
        self
    }
}

fn step_span(step: PipelineStep) -> tracing::Span {
    tracing::info_span!(
        "pipeline_step",
        step = step.as_str(),
        component = tracing::field::Empty,
        operation = tracing::field::Empty
    )
    .component("sw-core")
    .operation(step.as_str())
}

/// The source-control and deploy hosts a pipeline talks to
#[derive(Clone)]
pub struct PipelineHosts {
    pub source: Arc<dyn SourceHost>,
    pub deploy: Arc<dyn DeployHost>,
}

pub struct Pipeline {
    hosts: PipelineHosts,
    source_credential: Credential,
    deploy_credential: Credential,
}

impl Pipeline {
    /// `hosts` must be clients authenticated with the given credentials
    pub fn new(hosts: PipelineHosts, source_credential: Credential, deploy_credential: Credential) -> Self {
        Self {
            hosts,
            source_credential,
            deploy_credential,
        }
    }

    async fn validate_credentials(&self) -> Result<Identity, PipelineError> {
        let identity = validate(self.hosts.source.as_ref(), &self.source_credential)
            .await
            .map_err(|e| PipelineError::from_credentials(&e))?;
        validate_deploy_key(self.hosts.deploy.as_ref(), &self.deploy_credential)
            .await
            .map_err(|e| PipelineError::from_credentials(&e))?;
        Ok(identity)
    }

    /// Run the whole pipeline for `config`
    ///
    /// Never panics on remote failures: the returned report carries the
    /// classified error that decides the exit status.
    pub async fn run(&self, config: &PipelineConfig) -> RunReport {
        let mut report = RunReport::default();
        tracing::info!(
            repository = %config.repository_name,
            service = %config.service_name,
            branch = %config.branch,
            "starting deploy"
        );

        let step = PipelineStep::ValidateCredentials;
        let identity = match self.validate_credentials().instrument(step_span(step)).await {
            Ok(identity) => identity,
            Err(err) => return report.abort(err),
        };
        report.succeed(step);
        report.identity = Some(identity.clone());

        let step = PipelineStep::AcquireLock;
        let path = lock_path(&config.repository_name, &config.service_name);
        let _lock = match RunLock::acquire(path) {
            Ok(lock) => lock,
            Err(err) => return report.abort(PipelineError::from_core(step, &err)),
        };
        report.succeed(step);

        let copy = WorkingCopy::new(&config.project_root)
            .with_auth(GitAuth::from_credential(&self.source_credential));
        let synchronizer = RepositorySynchronizer::new(
            self.hosts.source.clone(),
            identity,
            copy,
            config.sync_options(),
        );

        let step = PipelineStep::EnsureRepository;
        let repository = match synchronizer
            .ensure_repository(&config.repository_name)
            .instrument(step_span(step))
            .await
        {
            Ok(repository) => repository,
            Err(err) => return report.abort(PipelineError::from_sync(step, &err)),
        };
        report.succeed(step);
        report.repository = Some(repository.clone());

        if config.skip_publish {
            report.skip(PipelineStep::LinkWorkingCopy, "publishing disabled");
            report.skip(PipelineStep::PublishChanges, "publishing disabled");
        } else {
            let step = PipelineStep::LinkWorkingCopy;
            if let Err(err) = synchronizer
                .ensure_local_linked(&repository)
                .instrument(step_span(step))
                .await
            {
                return report.abort(PipelineError::from_sync(step, &err));
            }
            report.succeed(step);

            let step = PipelineStep::PublishChanges;
            match synchronizer
                .publish_changes(&config.commit_message)
                .instrument(step_span(step))
                .await
            {
                Ok(publish) => {
                    report.succeed(step);
                    report.publish = Some(publish);
                }
                Err(err) => return report.abort(PipelineError::from_sync(step, &err)),
            }
        }

        let step = PipelineStep::EnsureService;
        let registry = ServiceRegistry::new(self.hosts.deploy.clone(), config.retry.clone())
            .with_owner_id(config.owner_id.clone())
            .with_auto_deploy(config.auto_deploy);
        let spec = config.service_spec(repository.repository_ref());
        let service = match registry
            .ensure_service(&spec, config.service_id.as_deref())
            .instrument(step_span(step))
            .await
        {
            Ok(service) => service,
            Err(err) => return report.abort(PipelineError::from_core(step, &err)),
        };
        report.succeed(step);
        let service_id = service.descriptor.id.clone();
        report.service = Some(service);

        let controller = DeployController::new(
            self.hosts.deploy.clone(),
            config.retry.clone(),
            config.poll_interval,
            config.timeout,
        );

        let step = PipelineStep::TriggerDeploy;
        let mut record = match controller.trigger(&service_id).instrument(step_span(step)).await {
            Ok(record) => {
                report.succeed(step);
                record
            }
            Err(err) => {
                report.fail(PipelineError::new(step, ErrorKind::DeployFailed, err.to_string()));
                report.skip(PipelineStep::AwaitDeploy, "trigger failed");
                let record = DeployRecord::rejected(service_id.clone());
                report.deploy = Some(record);
                roll_back(&controller, config, &service_id, None, &mut report).await;
                return report;
            }
        };

        if !config.wait {
            report.deploy = Some(record);
            report.skip_remaining("not waiting for the deploy outcome");
            return report;
        }

        let step = PipelineStep::AwaitDeploy;
        let outcome = controller
            .await_outcome(&mut record)
            .instrument(step_span(step))
            .await;
        let failed_id = record.id.clone();
        report.deploy = Some(record);

        match outcome {
            Ok(DeployStatus::Live) => {
                report.succeed(step);
                match controller.live_url(&service_id).await {
                    Ok(url) => report.live_url = url,
                    Err(err) => tracing::warn!(error = %err, "deploy is live but the service URL could not be read"),
                }
                report.skip(PipelineStep::Rollback, "deploy is live");
            }
            Ok(status) => {
                report.fail(PipelineError::new(
                    step,
                    ErrorKind::DeployFailed,
                    format!("deploy finished as {}", status),
                ));
                roll_back(&controller, config, &service_id, failed_id.as_deref(), &mut report).await;
            }
            Err(err) => {
                report.fail(PipelineError::from_core(step, &err));
                report.skip(PipelineStep::Rollback, "deploy outcome unknown");
            }
        }

        if report.succeeded() {
            tracing::info!(
                service_id = %service_id,
                url = report.live_url.as_deref().unwrap_or("-"),
                "deploy complete"
            );
        }
        report
    }
}

/// One best-effort rollback after a failed deploy
async fn roll_back(
    controller: &DeployController,
    config: &PipelineConfig,
    service_id: &str,
    failed_deploy_id: Option<&str>,
    report: &mut RunReport,
) {
    let step = PipelineStep::Rollback;
    if !config.rollback_on_failure {
        report.skip(step, "rollback disabled");
        return;
    }

    match controller
        .rollback(service_id, failed_deploy_id)
        .instrument(step_span(step))
        .await
    {
        Ok(RollbackResult::Unsupported { reason }) => {
            report.fail(PipelineError::new(
                step,
                ErrorKind::RollbackUnsupported,
                reason.to_string(),
            ));
            report.rollback = Some(RollbackResult::Unsupported { reason });
        }
        Ok(result) => {
            report.succeed(step);
            report.rollback = Some(result);
        }
        Err(err) => {
            report.fail(PipelineError::new(step, ErrorKind::RollbackFailed, err.to_string()));
        }
    }
}
