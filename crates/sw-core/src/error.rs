// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error taxonomy of the deployment pipeline

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use sw_domain_types::{DeployStatus, InvalidTransition};
use sw_repo::{SyncError, VcsError};
use sw_rest_client::RestClientError;
use thiserror::Error;

/// Result type alias for registry and deploy operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Failure classes every pipeline error falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Auth,
    TransientNetwork,
    /// Recovered by fetching the existing resource
    AlreadyExistsConflict,
    Push,
    Provisioning,
    DeployFailed,
    RollbackUnsupported,
    RollbackFailed,
    LocalVcs,
    DeployTimeout,
    Locked,
    Config,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::TransientNetwork => "transient-network",
            ErrorKind::AlreadyExistsConflict => "already-exists-conflict",
            ErrorKind::Push => "push",
            ErrorKind::Provisioning => "provisioning",
            ErrorKind::DeployFailed => "deploy-failed",
            ErrorKind::RollbackUnsupported => "rollback-unsupported",
            ErrorKind::RollbackFailed => "rollback-failed",
            ErrorKind::LocalVcs => "local-vcs",
            ErrorKind::DeployTimeout => "deploy-timeout",
            ErrorKind::Locked => "locked",
            ErrorKind::Config => "config",
        }
    }

    /// Classify a REST failure; anything not otherwise recognised is
    /// `fallback`
    pub fn of_rest(err: &RestClientError, fallback: ErrorKind) -> ErrorKind {
        if err.is_auth() {
            ErrorKind::Auth
        } else if err.is_transient() {
            ErrorKind::TransientNetwork
        } else if err.is_conflict() {
            ErrorKind::AlreadyExistsConflict
        } else {
            fallback
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pipeline steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStep {
    ValidateCredentials,
    AcquireLock,
    EnsureRepository,
    LinkWorkingCopy,
    PublishChanges,
    EnsureService,
    TriggerDeploy,
    AwaitDeploy,
    Rollback,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 9] = [
        PipelineStep::ValidateCredentials,
        PipelineStep::AcquireLock,
        PipelineStep::EnsureRepository,
        PipelineStep::LinkWorkingCopy,
        PipelineStep::PublishChanges,
        PipelineStep::EnsureService,
        PipelineStep::TriggerDeploy,
        PipelineStep::AwaitDeploy,
        PipelineStep::Rollback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStep::ValidateCredentials => "validate-credentials",
            PipelineStep::AcquireLock => "acquire-lock",
            PipelineStep::EnsureRepository => "ensure-repository",
            PipelineStep::LinkWorkingCopy => "link-working-copy",
            PipelineStep::PublishChanges => "publish-changes",
            PipelineStep::EnsureService => "ensure-service",
            PipelineStep::TriggerDeploy => "trigger-deploy",
            PipelineStep::AwaitDeploy => "await-deploy",
            PipelineStep::Rollback => "rollback",
        }
    }

    /// Exit status for failures that are classified by where they happened
    fn exit_code(self) -> i32 {
        match self {
            PipelineStep::ValidateCredentials => 10,
            PipelineStep::AcquireLock => 20,
            PipelineStep::EnsureRepository => 11,
            PipelineStep::LinkWorkingCopy | PipelineStep::PublishChanges => 12,
            PipelineStep::EnsureService => 14,
            PipelineStep::TriggerDeploy => 15,
            PipelineStep::AwaitDeploy => 19,
            PipelineStep::Rollback => 17,
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of registry, deploy and locking operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: RestClientError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("the deploy host lists no owner for this key; set service.owner-id")]
    NoOwner,

    #[error("deploy {deploy_id} did not finish within {waited_secs}s (last status {last_status})")]
    Timeout {
        deploy_id: String,
        waited_secs: u64,
        last_status: DeployStatus,
    },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("another run holds the lock {0}")]
    Locked(PathBuf),

    #[error("cannot open lock file {path}: {source}")]
    LockFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub fn remote(operation: &'static str, source: RestClientError) -> Self {
        CoreError::Remote { operation, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Remote { source, .. } => ErrorKind::of_rest(source, ErrorKind::Provisioning),
            CoreError::Config(_) => ErrorKind::Config,
            CoreError::NoOwner => ErrorKind::Provisioning,
            CoreError::Timeout { .. } => ErrorKind::DeployTimeout,
            CoreError::InvalidTransition(_) => ErrorKind::Provisioning,
            CoreError::Locked(_) => ErrorKind::Locked,
            CoreError::LockFile { .. } => ErrorKind::LocalVcs,
        }
    }
}

/// A classified failure of one pipeline step
#[derive(Debug, Clone, Error, Serialize)]
#[error("{step} failed ({kind}): {message}")]
pub struct PipelineError {
    pub step: PipelineStep,
    pub kind: ErrorKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(step: PipelineStep, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            step,
            kind,
            message: message.into(),
        }
    }

    pub fn from_core(step: PipelineStep, err: &CoreError) -> Self {
        Self::new(step, err.kind(), err.to_string())
    }

    pub fn from_sync(step: PipelineStep, err: &SyncError) -> Self {
        let kind = match err {
            SyncError::Provisioning(source) => ErrorKind::of_rest(source, ErrorKind::Provisioning),
            SyncError::Vcs(vcs) => vcs_kind(vcs),
        };
        Self::new(step, kind, err.to_string())
    }

    pub fn from_vcs(step: PipelineStep, err: &VcsError) -> Self {
        Self::new(step, vcs_kind(err), err.to_string())
    }

    pub fn from_credentials(err: &sw_credentials::Error) -> Self {
        let kind = match err {
            sw_credentials::Error::Unavailable { .. } => ErrorKind::TransientNetwork,
            _ => ErrorKind::Auth,
        };
        Self::new(PipelineStep::ValidateCredentials, kind, err.to_string())
    }

    /// Process exit status for this failure
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::Config => 2,
            ErrorKind::Auth => 10,
            ErrorKind::LocalVcs => 12,
            ErrorKind::Push => 13,
            ErrorKind::DeployFailed if self.step == PipelineStep::TriggerDeploy => 15,
            ErrorKind::DeployFailed => 16,
            ErrorKind::RollbackFailed => 17,
            ErrorKind::RollbackUnsupported => 18,
            ErrorKind::DeployTimeout => 19,
            ErrorKind::Locked => 20,
            ErrorKind::Provisioning | ErrorKind::TransientNetwork | ErrorKind::AlreadyExistsConflict => {
                self.step.exit_code()
            }
        }
    }
}

fn vcs_kind(err: &VcsError) -> ErrorKind {
    match err {
        VcsError::Push { .. } => ErrorKind::Push,
        _ => ErrorKind::LocalVcs,
    }
}
