// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use sw_domain_types::Identity;
use sw_rest_client::{
    StatusCode,
    AuthenticatedUser, CreateRepositoryRequest, RemoteOwnerLogin, RemoteRepository,
    RestClientError, RestClientResult, SourceHost,
};
use tokio::sync::RwLock;

use crate::FailurePlan;

/// State behind a [`FakeSourceHost`]
#[derive(Debug, Clone)]
pub struct SourceState {
    pub login: String,
    /// Scopes reported for the token; `None` omits the scopes header
    pub scopes: Option<Vec<String>>,
    /// Answer every call with 401
    pub reject_credentials: bool,
    /// Clone URLs are `<clone_base>/<owner>/<name>.git`
    pub clone_base: String,
    pub repositories: HashMap<String, RemoteRepository>,
    pub failures: FailurePlan,
    /// Every call in order, as `"<operation> <argument>"`
    pub calls: Vec<String>,
}

impl SourceState {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            scopes: Some(vec!["repo".to_string()]),
            reject_credentials: false,
            clone_base: "https://github.com".to_string(),
            repositories: HashMap::new(),
            failures: FailurePlan::default(),
            calls: Vec::new(),
        }
    }

    pub fn with_scopes(mut self, scopes: Option<Vec<&str>>) -> Self {
        self.scopes = scopes.map(|s| s.into_iter().map(str::to_string).collect());
        self
    }

    pub fn rejecting_credentials(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    pub fn with_clone_base(mut self, clone_base: &str) -> Self {
        self.clone_base = clone_base.trim_end_matches('/').to_string();
        self
    }

    /// Pre-existing repository owned by the authenticated user
    pub fn with_repository(mut self, name: &str) -> Self {
        let repository = self.repository(name, false);
        self.repositories.insert(name.to_string(), repository);
        self
    }

    pub fn failing(mut self, operation: &str, status: StatusCode, times: usize) -> Self {
        self.failures.fail(operation, status, times);
        self
    }

    fn repository(&self, name: &str, private: bool) -> RemoteRepository {
        RemoteRepository {
            name: name.to_string(),
            owner: RemoteOwnerLogin {
                login: self.login.clone(),
            },
            html_url: format!("https://github.com/{}/{}", self.login, name),
            clone_url: format!("{}/{}/{}.git", self.clone_base, self.login, name),
            default_branch: Some("main".to_string()),
            private,
        }
    }

    fn begin(&mut self, method: &str, operation: &str, argument: &str) -> RestClientResult<()> {
        self.calls.push(format!("{} {}", operation, argument).trim_end().to_string());
        if self.reject_credentials {
            return Err(RestClientError::status_error(
                method,
                operation,
                StatusCode::UNAUTHORIZED,
                "Bad credentials",
            ));
        }
        match self.failures.next(method, operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-memory [`SourceHost`]
#[derive(Debug, Clone)]
pub struct FakeSourceHost {
    state: Arc<RwLock<SourceState>>,
}

impl FakeSourceHost {
    pub fn new(login: &str) -> Self {
        Self::from_state(SourceState::new(login))
    }

    pub fn from_state(state: SourceState) -> Self {
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

    pub async fn repository_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().await.repositories.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl SourceHost for FakeSourceHost {
    async fn current_user(&self) -> RestClientResult<AuthenticatedUser> {
        let mut state = self.state.write().await;
        state.begin("GET", "current_user", "")?;
        Ok(AuthenticatedUser {
            identity: Identity {
                login: state.login.clone(),
            },
            scopes: state.scopes.clone(),
        })
    }

    async fn create_repository(
        &self,
        request: &CreateRepositoryRequest,
    ) -> RestClientResult<RemoteRepository> {
        let mut state = self.state.write().await;
        state.begin("POST", "create_repository", &request.name)?;
        if state.repositories.contains_key(&request.name) {
            return Err(RestClientError::status_error(
                "POST",
                "/user/repos",
                StatusCode::UNPROCESSABLE_ENTITY,
                "name already exists on this account",
            ));
        }
        let repository = state.repository(&request.name, request.private);
        state.repositories.insert(request.name.clone(), repository.clone());
        Ok(repository)
    }

    async fn get_repository(&self, owner: &str, name: &str) -> RestClientResult<RemoteRepository> {
        let mut state = self.state.write().await;
        state.begin("GET", "get_repository", &format!("{}/{}", owner, name))?;
        match state.repositories.get(name) {
            Some(repository) if repository.owner.login == owner => Ok(repository.clone()),
            _ => Err(RestClientError::status_error(
                "GET",
                format!("/repos/{}/{}", owner, name),
                StatusCode::NOT_FOUND,
                "Not Found",
            )),
        }
    }
}
