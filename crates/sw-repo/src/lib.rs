// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Repository synchronisation for Shipwright.
//!
//! This crate provisions the remote repository on the source-control host,
//! links the local project to it, keeps secret files out of version control
//! and publishes local changes with header-based git authentication.

pub mod error;
pub mod git_auth;
pub mod secrets;
pub mod synchronizer;
pub mod working_copy;

pub use error::{PushErrorCause, SyncError, SyncResult, VcsError, VcsResult};
pub use git_auth::{redact_url, GitAuth};
pub use secrets::{
    exclude_secrets, purge_from_history, security_report, tracked_secrets, SecretExclusion,
};
pub use synchronizer::{RepositorySynchronizer, SyncOptions};
pub use working_copy::{classify_push_failure, WorkingCopy, REMOTE_NAME};
