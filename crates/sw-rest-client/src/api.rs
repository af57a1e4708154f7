// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Host-facing traits and their wire types
//!
//! [`SourceHost`] and [`DeployHost`] are the seams the pipeline depends on;
//! the reqwest-backed clients implement them for GitHub and Render and the
//! mock crate provides in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sw_domain_types::{DeployStatus, Identity, RepositoryDescriptor, ServiceDescriptor};

use crate::error::RestClientResult;

/// The authenticated account together with the scopes its token carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub identity: Identity,
    /// `None` when the host did not report scopes (fine-grained tokens)
    pub scopes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRepositoryRequest {
    pub name: String,
    pub private: bool,
    pub auto_init: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteOwnerLogin {
    pub login: String,
}

/// Repository as returned by the source host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteRepository {
    pub name: String,
    pub owner: RemoteOwnerLogin,
    pub html_url: String,
    pub clone_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
}

impl RemoteRepository {
    pub fn into_descriptor(self, fallback_branch: &str) -> RepositoryDescriptor {
        RepositoryDescriptor {
            owner: self.owner.login,
            name: self.name,
            default_branch: self
                .default_branch
                .unwrap_or_else(|| fallback_branch.to_string()),
            remote_url: self.clone_url,
            html_url: self.html_url,
        }
    }
}

/// Source-control host operations
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// `GET /user`
    async fn current_user(&self) -> RestClientResult<AuthenticatedUser>;

    /// Create a repository under the authenticated account; a name clash
    /// surfaces as a conflict error
    async fn create_repository(
        &self,
        request: &CreateRepositoryRequest,
    ) -> RestClientResult<RemoteRepository>;

    async fn get_repository(&self, owner: &str, name: &str) -> RestClientResult<RemoteRepository>;
}

/// Workspace or team that owns services on the deploy host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOwner {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSpecificDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteServiceDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_specific_details: Option<EnvSpecificDetails>,
}

/// Service as returned by the deploy host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteService {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub dashboard_url: Option<String>,
    #[serde(default)]
    pub service_details: RemoteServiceDetails,
}

impl RemoteService {
    pub fn into_descriptor(self) -> ServiceDescriptor {
        let details = self.service_details;
        let commands = details.env_specific_details.unwrap_or_default();
        ServiceDescriptor {
            id: self.id,
            name: self.name,
            repository_ref: self.repo,
            branch: self.branch,
            build_command: commands.build_command,
            start_command: commands.start_command,
            plan: details.plan,
            region: details.region,
            dashboard_url: self.dashboard_url,
            live_url: details.url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceDetails {
    pub runtime: String,
    pub plan: String,
    pub region: String,
    pub env_specific_details: EnvSpecificDetails,
}

/// `POST /services` body for a web service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    #[serde(rename = "type")]
    pub service_type: String,
    pub name: String,
    pub owner_id: String,
    pub repo: String,
    pub branch: String,
    /// `"yes"` or `"no"`
    pub auto_deploy: String,
    pub service_details: CreateServiceDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceDetails {
    pub env_specific_details: EnvSpecificDetails,
}

/// `PATCH /services/{id}` body; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_details: Option<UpdateServiceDetails>,
}

/// Deploy status values reported by the deploy host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteDeployStatus {
    Created,
    Queued,
    BuildInProgress,
    UpdateInProgress,
    PreDeployInProgress,
    Live,
    Deactivated,
    BuildFailed,
    UpdateFailed,
    PreDeployFailed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl RemoteDeployStatus {
    /// Map onto the pipeline's deploy state machine
    ///
    /// `deactivated` means the deploy went live earlier and was superseded, so
    /// it only appears when inspecting history; here it counts as terminal.
    pub fn to_deploy_status(self) -> DeployStatus {
        use RemoteDeployStatus::*;
        match self {
            Created | Queued | Unknown => DeployStatus::Pending,
            BuildInProgress | UpdateInProgress | PreDeployInProgress => DeployStatus::Building,
            Live => DeployStatus::Live,
            Deactivated | BuildFailed | UpdateFailed | PreDeployFailed | Canceled => {
                DeployStatus::Failed
            }
        }
    }

    /// Like [`Self::to_deploy_status`], but `None` for statuses this client
    /// does not recognise
    pub fn known_status(self) -> Option<DeployStatus> {
        (self != RemoteDeployStatus::Unknown).then(|| self.to_deploy_status())
    }

    /// The deploy went live at some point
    pub fn was_successful(self) -> bool {
        matches!(self, RemoteDeployStatus::Live | RemoteDeployStatus::Deactivated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteCommit {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// One deploy as reported by the deploy host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDeploy {
    pub id: String,
    pub status: RemoteDeployStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub commit: Option<RemoteCommit>,
}

/// Deploy host operations
#[async_trait]
pub trait DeployHost: Send + Sync {
    async fn list_owners(&self) -> RestClientResult<Vec<RemoteOwner>>;

    /// Services whose name matches exactly
    async fn find_services_by_name(&self, name: &str) -> RestClientResult<Vec<RemoteService>>;

    async fn get_service(&self, service_id: &str) -> RestClientResult<RemoteService>;

    async fn create_service(&self, request: &CreateServiceRequest) -> RestClientResult<RemoteService>;

    async fn update_service(
        &self,
        service_id: &str,
        request: &UpdateServiceRequest,
    ) -> RestClientResult<RemoteService>;

    /// Start a new deploy of the service's configured branch
    async fn trigger_deploy(&self, service_id: &str) -> RestClientResult<RemoteDeploy>;

    async fn get_deploy(&self, service_id: &str, deploy_id: &str) -> RestClientResult<RemoteDeploy>;

    /// Most recent deploys first
    async fn list_deploys(&self, service_id: &str, limit: u32) -> RestClientResult<Vec<RemoteDeploy>>;

    /// Redeploy the artifact of an earlier deploy
    async fn rollback(&self, service_id: &str, deploy_id: &str) -> RestClientResult<RemoteDeploy>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_status_mapping() {
        use RemoteDeployStatus::*;
        assert_eq!(Created.to_deploy_status(), DeployStatus::Pending);
        assert_eq!(BuildInProgress.to_deploy_status(), DeployStatus::Building);
        assert_eq!(UpdateInProgress.to_deploy_status(), DeployStatus::Building);
        assert_eq!(Live.to_deploy_status(), DeployStatus::Live);
        assert_eq!(BuildFailed.to_deploy_status(), DeployStatus::Failed);
        assert_eq!(Canceled.to_deploy_status(), DeployStatus::Failed);
        assert!(Deactivated.was_successful());
        assert!(!UpdateFailed.was_successful());
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let deploy: RemoteDeploy =
            serde_json::from_str(r#"{"id":"dep-1","status":"something_new"}"#).unwrap();
        assert_eq!(deploy.status, RemoteDeployStatus::Unknown);
        assert_eq!(deploy.status.to_deploy_status(), DeployStatus::Pending);
    }

    #[test]
    fn test_service_descriptor_conversion() {
        let json = r#"{
            "id": "srv-abc",
            "name": "flask-demo",
            "repo": "https://github.com/octo/flask-demo",
            "branch": "main",
            "dashboardUrl": "https://dashboard.render.com/web/srv-abc",
            "serviceDetails": {
                "url": "https://flask-demo.onrender.com",
                "plan": "free",
                "region": "oregon",
                "envSpecificDetails": {
                    "buildCommand": "pip install -r requirements.txt",
                    "startCommand": "gunicorn app:app"
                }
            }
        }"#;
        let service: RemoteService = serde_json::from_str(json).unwrap();
        let descriptor = service.into_descriptor();
        assert_eq!(descriptor.id, "srv-abc");
        assert_eq!(descriptor.live_url.as_deref(), Some("https://flask-demo.onrender.com"));
        assert_eq!(descriptor.start_command.as_deref(), Some("gunicorn app:app"));
    }

    #[test]
    fn test_create_service_body_shape() {
        let request = CreateServiceRequest {
            service_type: "web_service".to_string(),
            name: "flask-demo".to_string(),
            owner_id: "tea-1".to_string(),
            repo: "https://github.com/octo/flask-demo".to_string(),
            branch: "main".to_string(),
            auto_deploy: "no".to_string(),
            service_details: CreateServiceDetails {
                runtime: "python".to_string(),
                plan: "free".to_string(),
                region: "oregon".to_string(),
                env_specific_details: EnvSpecificDetails {
                    build_command: Some("pip install -r requirements.txt".to_string()),
                    start_command: Some("gunicorn app:app".to_string()),
                },
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], "web_service");
        assert_eq!(value["ownerId"], "tea-1");
        assert_eq!(value["autoDeploy"], "no");
        assert_eq!(
            value["serviceDetails"]["envSpecificDetails"]["startCommand"],
            "gunicorn app:app"
        );
    }

    #[test]
    fn test_partial_update_request() {
        let body = serde_json::to_value(UpdateServiceRequest {
            branch: Some("main".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"branch": "main"}));
    }
}
