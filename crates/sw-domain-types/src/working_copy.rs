// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Local working-copy state and publish outcomes

use serde::{Deserialize, Serialize};

/// Derived state of the local working copy
///
/// Recomputed from the filesystem at the start of every run; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkingCopyState {
    pub initialized: bool,
    pub has_remote: bool,
    pub has_pending_changes: bool,
}

/// Outcome of publishing local changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishResult {
    /// Nothing changed: no commit was created and nothing was pushed
    NoOp,
    /// A commit was created and pushed
    Published {
        commit: String,
        branch: String,
        files: usize,
    },
    /// The tree was clean but local commits were not yet on the remote
    PushedPending { branch: String },
}

impl PublishResult {
    pub fn is_noop(&self) -> bool {
        matches!(self, PublishResult::NoOp)
    }
}

/// Pre-flight security findings for a project
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityReport {
    /// Every declared secrets pattern is listed in `.gitignore`
    pub secrets_ignored: bool,
    /// The source-control credential was accepted by the host
    pub credential_valid: bool,
    /// Secret files currently tracked by version control
    pub tracked_secrets: Vec<String>,
}

impl SecurityReport {
    pub fn is_clean(&self) -> bool {
        self.secrets_ignored && self.credential_valid && self.tracked_secrets.is_empty()
    }
}
