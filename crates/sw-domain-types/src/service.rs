// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Deployable-service domain types

use serde::{Deserialize, Serialize};

/// Desired state of a deployable service
///
/// `plan`, `region` and `runtime` are only sent when the service is created;
/// later runs reconcile the repository, branch and commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub repository_ref: String,
    pub branch: String,
    pub build_command: String,
    pub start_command: String,
    pub plan: String,
    pub region: String,
    pub runtime: String,
}

/// A service record as held by the deploy host
///
/// The `id` is assigned remotely and stays stable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub id: String,
    pub name: String,
    pub repository_ref: Option<String>,
    pub branch: Option<String>,
    pub build_command: Option<String>,
    pub start_command: Option<String>,
    pub plan: Option<String>,
    pub region: Option<String>,
    pub dashboard_url: Option<String>,
    /// Public URL, present once the host has provisioned one
    pub live_url: Option<String>,
}

impl ServiceDescriptor {
    /// Whether the repository/branch/command fields already match `spec`
    pub fn matches(&self, spec: &ServiceSpec) -> bool {
        self.repository_ref.as_deref() == Some(spec.repository_ref.as_str())
            && self.branch.as_deref() == Some(spec.branch.as_str())
            && self.build_command.as_deref() == Some(spec.build_command.as_str())
            && self.start_command.as_deref() == Some(spec.start_command.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ServiceSpec {
        ServiceSpec {
            name: "shop".to_string(),
            repository_ref: "https://github.com/octo/shop".to_string(),
            branch: "main".to_string(),
            build_command: "pip install -r requirements.txt".to_string(),
            start_command: "gunicorn app:app".to_string(),
            plan: "free".to_string(),
            region: "oregon".to_string(),
            runtime: "python".to_string(),
        }
    }

    #[test]
    fn test_matches_ignores_creation_only_fields() {
        let spec = spec();
        let service = ServiceDescriptor {
            id: "srv-1".to_string(),
            name: spec.name.clone(),
            repository_ref: Some(spec.repository_ref.clone()),
            branch: Some(spec.branch.clone()),
            build_command: Some(spec.build_command.clone()),
            start_command: Some(spec.start_command.clone()),
            plan: Some("starter".to_string()),
            region: None,
            dashboard_url: None,
            live_url: None,
        };
        assert!(service.matches(&spec));

        let drifted = ServiceDescriptor {
            start_command: Some("python app.py".to_string()),
            ..service
        };
        assert!(!drifted.matches(&spec));
    }
}
