// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for repository synchronisation

use std::fmt;
use std::path::PathBuf;
use sw_rest_client::RestClientError;
use thiserror::Error;

/// Result type alias for local git operations
pub type VcsResult<T> = std::result::Result<T, VcsError>;

/// Result type alias for synchronizer operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Why a push was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushErrorCause {
    /// The remote has commits the local branch does not
    NonFastForward,
    /// The remote refused the credential
    AuthRejected,
    /// The remote could not be reached
    Network,
    Other,
}

impl fmt::Display for PushErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushErrorCause::NonFastForward => write!(f, "non-fast-forward"),
            PushErrorCause::AuthRejected => write!(f, "authentication rejected"),
            PushErrorCause::Network => write!(f, "network error"),
            PushErrorCause::Other => write!(f, "other"),
        }
    }
}

/// Failures of local git commands
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("git executable not found on PATH")]
    GitNotFound,

    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),

    #[error("`git {command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("push of '{branch}' failed ({cause}): {stderr}")]
    Push {
        branch: String,
        cause: PushErrorCause,
        stderr: String,
    },

    #[error("git filter-repo is not installed")]
    FilterRepoMissing,

    #[error("not a git working copy: {0}")]
    NotARepository(PathBuf),

    #[error("on branch '{current}' but '{expected}' is deployed; switch to '{expected}' first")]
    WrongBranch { current: String, expected: String },
}

impl VcsError {
    pub fn push_cause(&self) -> Option<PushErrorCause> {
        match self {
            VcsError::Push { cause, .. } => Some(*cause),
            _ => None,
        }
    }
}

/// Failures of the repository synchronizer
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("repository provisioning failed: {0}")]
    Provisioning(#[source] RestClientError),

    #[error(transparent)]
    Vcs(#[from] VcsError),
}
