// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Repository-related domain types
//!
//! Types describing the remote source-control repository and the identity
//! that owns it.

use serde::{Deserialize, Serialize};

/// Authenticated user of the source-control host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub login: String,
}

/// Remote repository as known to the source-control host
///
/// `remote_url` is the canonical clone URL. It never carries credentials;
/// authentication is passed to git out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub remote_url: String,
    pub html_url: String,
}

impl RepositoryDescriptor {
    /// `owner/name` form used in log lines and API paths
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// The web URL of the repository, usable as a service `repo` reference
    pub fn repository_ref(&self) -> &str {
        &self.html_url
    }
}
