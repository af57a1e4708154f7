// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use sw_rest_client::{
    StatusCode,
    CreateServiceRequest, DeployHost, EnvSpecificDetails, RemoteDeploy, RemoteDeployStatus,
    RemoteOwner, RemoteService, RemoteServiceDetails, RestClientError, RestClientResult,
    UpdateServiceRequest,
};
use tokio::sync::RwLock;

use crate::FailurePlan;

/// State behind a [`FakeDeployHost`]
#[derive(Debug, Clone)]
pub struct DeployState {
    pub owners: Vec<RemoteOwner>,
    pub services: Vec<RemoteService>,
    /// Deploys per service, most recent first
    pub deploys: HashMap<String, Vec<RemoteDeploy>>,
    /// Statuses a triggered deploy reports on successive polls; the last one
    /// sticks
    pub deploy_script: Vec<RemoteDeployStatus>,
    /// Answer every call with 401
    pub reject_credentials: bool,
    /// Store the created service but answer with 502, once
    pub lose_create_response: bool,
    pub failures: FailurePlan,
    /// Every call in order, as `"<operation> <argument>"`
    pub calls: Vec<String>,
    poll_counts: HashMap<String, usize>,
    next_id: u64,
}

impl Default for DeployState {
    fn default() -> Self {
        Self {
            owners: vec![RemoteOwner {
                id: "tea-fake".to_string(),
                name: "Fake Team".to_string(),
                email: None,
            }],
            services: Vec::new(),
            deploys: HashMap::new(),
            deploy_script: vec![RemoteDeployStatus::BuildInProgress, RemoteDeployStatus::Live],
            reject_credentials: false,
            lose_create_response: false,
            failures: FailurePlan::default(),
            calls: Vec::new(),
            poll_counts: HashMap::new(),
            next_id: 1,
        }
    }
}

impl DeployState {
    /// Pre-existing service with default build and start commands
    pub fn with_service(mut self, name: &str, repo: &str, branch: &str) -> Self {
        let id = self.next_id("srv");
        self.services.push(RemoteService {
            id,
            name: name.to_string(),
            repo: Some(repo.to_string()),
            branch: Some(branch.to_string()),
            dashboard_url: None,
            service_details: RemoteServiceDetails {
                url: Some(format!("https://{}.onrender.com", name)),
                plan: Some("free".to_string()),
                region: Some("oregon".to_string()),
                runtime: Some("python".to_string()),
                env_specific_details: Some(EnvSpecificDetails {
                    build_command: Some("pip install -r requirements.txt".to_string()),
                    start_command: Some("gunicorn app:app".to_string()),
                }),
            },
        });
        self
    }

    /// Add a historical deploy to the most recently added service
    pub fn with_past_deploy(mut self, status: RemoteDeployStatus) -> Self {
        let Some(service_id) = self.services.last().map(|s| s.id.clone()) else {
            return self;
        };
        let deploy = self.new_deploy(status);
        self.deploys.entry(service_id).or_default().insert(0, deploy);
        self
    }

    pub fn with_deploy_script(mut self, script: Vec<RemoteDeployStatus>) -> Self {
        self.deploy_script = script;
        self
    }

    pub fn with_owners(mut self, owners: Vec<RemoteOwner>) -> Self {
        self.owners = owners;
        self
    }

    pub fn rejecting_credentials(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    pub fn losing_create_response(mut self) -> Self {
        self.lose_create_response = true;
        self
    }

    pub fn failing(mut self, operation: &str, status: StatusCode, times: usize) -> Self {
        self.failures.fail(operation, status, times);
        self
    }

    fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{}-{}", prefix, self.next_id);
        self.next_id += 1;
        id
    }

    fn new_deploy(&mut self, status: RemoteDeployStatus) -> RemoteDeploy {
        RemoteDeploy {
            id: self.next_id("dep"),
            status,
            created_at: Some(Utc::now()),
            finished_at: None,
            commit: None,
        }
    }

    fn begin(&mut self, method: &str, operation: &str, argument: &str) -> RestClientResult<()> {
        self.calls.push(format!("{} {}", operation, argument).trim_end().to_string());
        if self.reject_credentials {
            return Err(RestClientError::status_error(
                method,
                operation,
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
            ));
        }
        match self.failures.next(method, operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn service_mut(&mut self, service_id: &str) -> RestClientResult<&mut RemoteService> {
        self.services
            .iter_mut()
            .find(|s| s.id == service_id)
            .ok_or_else(|| not_found(&format!("/services/{}", service_id)))
    }
}

fn not_found(path: &str) -> RestClientError {
    RestClientError::status_error("GET", path, StatusCode::NOT_FOUND, "not found")
}

/// In-memory [`DeployHost`]
#[derive(Debug, Clone)]
pub struct FakeDeployHost {
    state: Arc<RwLock<DeployState>>,
}

impl Default for FakeDeployHost {
    fn default() -> Self {
        Self::from_state(DeployState::default())
    }
}

impl FakeDeployHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: DeployState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn calls(&self) -> Vec<String> {
        self.state.read().await.calls.clone()
    }

    /// Number of recorded calls of `operation`
    pub async fn call_count(&self, operation: &str) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.split(' ').next() == Some(operation))
            .count()
    }

    pub async fn services(&self) -> Vec<RemoteService> {
        self.state.read().await.services.clone()
    }

    pub async fn deploys(&self, service_id: &str) -> Vec<RemoteDeploy> {
        self.state
            .read()
            .await
            .deploys
            .get(service_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DeployHost for FakeDeployHost {
    async fn list_owners(&self) -> RestClientResult<Vec<RemoteOwner>> {
        let mut state = self.state.write().await;
        state.begin("GET", "list_owners", "")?;
        Ok(state.owners.clone())
    }

    async fn find_services_by_name(&self, name: &str) -> RestClientResult<Vec<RemoteService>> {
        let mut state = self.state.write().await;
        state.begin("GET", "find_services_by_name", name)?;
        Ok(state
            .services
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect())
    }

    async fn get_service(&self, service_id: &str) -> RestClientResult<RemoteService> {
        let mut state = self.state.write().await;
        state.begin("GET", "get_service", service_id)?;
        state.service_mut(service_id).map(|s| s.clone())
    }

    async fn create_service(&self, request: &CreateServiceRequest) -> RestClientResult<RemoteService> {
        let mut state = self.state.write().await;
        state.begin("POST", "create_service", &request.name)?;
        let id = state.next_id("srv");
        let service = RemoteService {
            id: id.clone(),
            name: request.name.clone(),
            repo: Some(request.repo.clone()),
            branch: Some(request.branch.clone()),
            dashboard_url: Some(format!("https://dashboard.render.com/web/{}", id)),
            service_details: RemoteServiceDetails {
                url: Some(format!("https://{}.onrender.com", request.name)),
                plan: Some(request.service_details.plan.clone()),
                region: Some(request.service_details.region.clone()),
                runtime: Some(request.service_details.runtime.clone()),
                env_specific_details: Some(request.service_details.env_specific_details.clone()),
            },
        };
        state.services.push(service.clone());

        if state.lose_create_response {
            state.lose_create_response = false;
            return Err(RestClientError::status_error(
                "POST",
                "/services",
                StatusCode::BAD_GATEWAY,
                "upstream connection reset",
            ));
        }
        Ok(service)
    }

    async fn update_service(
        &self,
        service_id: &str,
        request: &UpdateServiceRequest,
    ) -> RestClientResult<RemoteService> {
        let mut state = self.state.write().await;
        state.begin("PATCH", "update_service", service_id)?;
        let service = state.service_mut(service_id)?;
        if let Some(repo) = &request.repo {
            service.repo = Some(repo.clone());
        }
        if let Some(branch) = &request.branch {
            service.branch = Some(branch.clone());
        }
        if let Some(details) = &request.service_details {
            let commands = service
                .service_details
                .env_specific_details
                .get_or_insert_with(Default::default);
            if details.env_specific_details.build_command.is_some() {
                commands.build_command = details.env_specific_details.build_command.clone();
            }
            if details.env_specific_details.start_command.is_some() {
                commands.start_command = details.env_specific_details.start_command.clone();
            }
        }
        Ok(service.clone())
    }

    async fn trigger_deploy(&self, service_id: &str) -> RestClientResult<RemoteDeploy> {
        let mut state = self.state.write().await;
        state.begin("POST", "trigger_deploy", service_id)?;
        state.service_mut(service_id)?;
        let deploy = state.new_deploy(RemoteDeployStatus::Created);
        state
            .deploys
            .entry(service_id.to_string())
            .or_default()
            .insert(0, deploy.clone());
        Ok(deploy)
    }

    async fn get_deploy(&self, service_id: &str, deploy_id: &str) -> RestClientResult<RemoteDeploy> {
        let mut state = self.state.write().await;
        state.begin("GET", "get_deploy", deploy_id)?;

        let polls = {
            let count = state.poll_counts.entry(deploy_id.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let scripted = state
            .deploy_script
            .get(polls - 1)
            .or(state.deploy_script.last())
            .copied();

        let deploy = state
            .deploys
            .get_mut(service_id)
            .and_then(|deploys| deploys.iter_mut().find(|d| d.id == deploy_id))
            .ok_or_else(|| not_found(&format!("/services/{}/deploys/{}", service_id, deploy_id)))?;
        if let Some(status) = scripted {
            if deploy.status.to_deploy_status().is_terminal() && deploy.finished_at.is_some() {
                return Ok(deploy.clone());
            }
            deploy.status = status;
            if status.to_deploy_status().is_terminal() {
                deploy.finished_at = Some(Utc::now());
            }
        }
        Ok(deploy.clone())
    }

    async fn list_deploys(&self, service_id: &str, limit: u32) -> RestClientResult<Vec<RemoteDeploy>> {
        let mut state = self.state.write().await;
        state.begin("GET", "list_deploys", service_id)?;
        Ok(state
            .deploys
            .get(service_id)
            .map(|d| d.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn rollback(&self, service_id: &str, deploy_id: &str) -> RestClientResult<RemoteDeploy> {
        let mut state = self.state.write().await;
        state.begin("POST", "rollback", &format!("{} {}", service_id, deploy_id))?;

        let known = state
            .deploys
            .get(service_id)
            .is_some_and(|deploys| deploys.iter().any(|d| d.id == deploy_id));
        if !known {
            return Err(RestClientError::status_error(
                "POST",
                format!("/services/{}/rollback", service_id),
                StatusCode::BAD_REQUEST,
                "unknown deploy",
            ));
        }

        let deploy = state.new_deploy(RemoteDeployStatus::Created);
        state
            .deploys
            .entry(service_id.to_string())
            .or_default()
            .insert(0, deploy.clone());
        Ok(deploy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_triggered_deploy_follows_script() {
        let host = FakeDeployHost::from_state(
            DeployState::default().with_service("shop", "https://github.com/octo/shop", "main"),
        );
        let service_id = host.services().await[0].id.clone();

        let deploy = host.trigger_deploy(&service_id).await.unwrap();
        assert_eq!(deploy.status, RemoteDeployStatus::Created);

        let first = host.get_deploy(&service_id, &deploy.id).await.unwrap();
        let second = host.get_deploy(&service_id, &deploy.id).await.unwrap();
        let third = host.get_deploy(&service_id, &deploy.id).await.unwrap();
        assert_eq!(first.status, RemoteDeployStatus::BuildInProgress);
        assert_eq!(second.status, RemoteDeployStatus::Live);
        assert_eq!(third.status, RemoteDeployStatus::Live);
    }

    #[tokio::test]
    async fn test_lost_create_response_still_stores_service() {
        let host = FakeDeployHost::from_state(DeployState::default().losing_create_response());
        let request = CreateServiceRequest {
            service_type: "web_service".to_string(),
            name: "shop".to_string(),
            owner_id: "tea-fake".to_string(),
            repo: "https://github.com/octo/shop".to_string(),
            branch: "main".to_string(),
            auto_deploy: "no".to_string(),
            service_details: sw_rest_client::CreateServiceDetails {
                runtime: "python".to_string(),
                plan: "free".to_string(),
                region: "oregon".to_string(),
                env_specific_details: EnvSpecificDetails::default(),
            },
        };

        assert!(host.create_service(&request).await.unwrap_err().is_transient());
        assert_eq!(host.find_services_by_name("shop").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rollback_requires_known_deploy() {
        let host = FakeDeployHost::from_state(
            DeployState::default()
                .with_service("shop", "https://github.com/octo/shop", "main")
                .with_past_deploy(RemoteDeployStatus::Live),
        );
        let service_id = host.services().await[0].id.clone();
        let previous = host.deploys(&service_id).await[0].id.clone();

        assert!(host.rollback(&service_id, "dep-unknown").await.is_err());
        let rollback = host.rollback(&service_id, &previous).await.unwrap();
        assert_ne!(rollback.id, previous);
        assert_eq!(host.call_count("rollback").await, 2);
    }
}
