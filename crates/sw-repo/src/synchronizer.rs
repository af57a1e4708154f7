// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Keeps the remote repository and the local working copy in step

use std::sync::Arc;

use sw_domain_types::{Identity, PublishResult, RepositoryDescriptor, WorkingCopyState};
use sw_rest_client::{with_retry, CreateRepositoryRequest, RestClientResult, RetryPolicy, SourceHost};

use crate::error::{SyncError, SyncResult, VcsError, VcsResult};
use crate::git_auth::redact_url;
use crate::secrets::{exclude_secrets, tracked_secrets};
use crate::working_copy::{WorkingCopy, REMOTE_NAME};

/// Settings for one synchronizer
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Branch that is pushed and deployed
    pub branch: String,
    pub secret_patterns: Vec<String>,
    /// Committer identity used only when git has none configured
    pub user_name: String,
    pub user_email: String,
    pub private: bool,
    pub description: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            branch: "main".to_string(),
            secret_patterns: vec![".env".to_string()],
            user_name: "Shipwright".to_string(),
            user_email: "shipwright@localhost".to_string(),
            private: false,
            description: None,
            retry: RetryPolicy::default(),
        }
    }
}

pub struct RepositorySynchronizer {
    host: Arc<dyn SourceHost>,
    identity: Identity,
    copy: WorkingCopy,
    options: SyncOptions,
}

impl RepositorySynchronizer {
    pub fn new(
        host: Arc<dyn SourceHost>,
        identity: Identity,
        copy: WorkingCopy,
        options: SyncOptions,
    ) -> Self {
        Self {
            host,
            identity,
            copy,
            options,
        }
    }

    pub fn working_copy(&self) -> &WorkingCopy {
        &self.copy
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Create the remote repository, or adopt it when it already exists
    ///
    /// A name clash is answered by fetching the existing repository, so
    /// repeated runs yield the same descriptor. Transient failures retry the
    /// whole create-or-fetch unit.
    pub async fn ensure_repository(&self, name: &str) -> SyncResult<RepositoryDescriptor> {
        let request = CreateRepositoryRequest {
            name: name.to_string(),
            private: self.options.private,
            auto_init: false,
            description: self.options.description.clone(),
        };

        let request = &request;
        let descriptor = with_retry(&self.options.retry, "ensure repository", move || {
            self.create_or_fetch(request)
        })
        .await
        .map_err(SyncError::Provisioning)?;

        tracing::info!(
            repository = %descriptor.full_name(),
            url = %descriptor.html_url,
            "repository ready"
        );
        Ok(descriptor)
    }

    async fn create_or_fetch(
        &self,
        request: &CreateRepositoryRequest,
    ) -> RestClientResult<RepositoryDescriptor> {
        match self.host.create_repository(request).await {
            Ok(created) => {
                tracing::info!(name = %request.name, "created repository");
                Ok(created.into_descriptor(&self.options.branch))
            }
            Err(err) if err.is_conflict() => {
                tracing::debug!(name = %request.name, "repository already exists, fetching it");
                let existing = self
                    .host
                    .get_repository(&self.identity.login, &request.name)
                    .await?;
                Ok(existing.into_descriptor(&self.options.branch))
            }
            Err(err) => Err(err),
        }
    }

    /// Make the project a git working copy whose `origin` is `descriptor`
    pub async fn ensure_local_linked(
        &self,
        descriptor: &RepositoryDescriptor,
    ) -> SyncResult<WorkingCopyState> {
        if !self.copy.is_initialized() {
            self.copy.init().await?;
        }

        if self.copy.config_get("user.name").await?.is_none() {
            self.copy.config_set("user.name", &self.options.user_name).await?;
        }
        if self.copy.config_get("user.email").await?.is_none() {
            self.copy.config_set("user.email", &self.options.user_email).await?;
        }

        match self.copy.remote_url(REMOTE_NAME).await? {
            None => {
                self.copy.add_remote(REMOTE_NAME, &descriptor.remote_url).await?;
                tracing::info!(remote = %descriptor.remote_url, "added origin");
            }
            Some(current) if current != descriptor.remote_url => {
                self.copy
                    .set_remote_url(REMOTE_NAME, &descriptor.remote_url)
                    .await?;
                tracing::info!(
                    from = %redact_url(&current),
                    to = %descriptor.remote_url,
                    "updated origin"
                );
            }
            Some(_) => {}
        }

        Ok(self.copy.state().await?)
    }

    /// Whether HEAD has to be renamed to the deployed branch before pushing
    ///
    /// Only a branch that does not exist yet is created by renaming; being on
    /// any other branch while it exists is refused.
    async fn needs_rename(&self) -> VcsResult<bool> {
        let expected = self.options.branch.as_str();
        let current = self.copy.current_branch().await?;
        if current.as_deref() == Some(expected) {
            return Ok(false);
        }
        if current.is_none() || self.copy.branch_exists(expected).await? {
            return Err(VcsError::WrongBranch {
                current: current.unwrap_or_else(|| "detached HEAD".to_string()),
                expected: expected.to_string(),
            });
        }
        Ok(true)
    }

    /// Commit and push local changes
    ///
    /// Secret exclusion always runs first. A clean tree with nothing waiting
    /// to be pushed is a no-op: no commit and no push.
    pub async fn publish_changes(&self, message: &str) -> SyncResult<PublishResult> {
        let branch = self.options.branch.as_str();
        let rename = self.needs_rename().await?;
        let exclusion = exclude_secrets(&self.copy, &self.options.secret_patterns).await?;
        if exclusion.changed_anything() {
            tracing::debug!(?exclusion, "secret exclusion applied");
        }

        let pending = self.copy.has_pending_changes().await?;
        let unpushed = self.copy.has_unpushed_commits(REMOTE_NAME, branch).await?;
        if !pending && !unpushed {
            tracing::info!("working tree clean and up to date, nothing to publish");
            return Ok(PublishResult::NoOp);
        }

        let mut commit = None;
        if pending {
            self.copy.add_all().await?;
            let staged_secrets = tracked_secrets(&self.copy, &self.options.secret_patterns).await?;
            if !staged_secrets.is_empty() {
                tracing::warn!(files = ?staged_secrets, "unstaging secret files");
                self.copy.rm_cached(&staged_secrets).await?;
            }
            let staged = self.copy.staged_files().await?;
            if !staged.is_empty() {
                self.log_preview(&staged).await;
                let id = self.copy.commit(message).await?;
                tracing::info!(commit = %id, files = staged.len(), "committed changes");
                commit = Some((id, staged.len()));
            }
        }

        if commit.is_none() && !unpushed {
            tracing::info!("only ignored files changed, nothing to publish");
            return Ok(PublishResult::NoOp);
        }

        if rename {
            self.copy.rename_branch(branch).await?;
        }
        self.copy.push(REMOTE_NAME, branch).await?;

        Ok(match commit {
            Some((commit, files)) => PublishResult::Published {
                commit,
                branch: branch.to_string(),
                files,
            },
            None => PublishResult::PushedPending {
                branch: branch.to_string(),
            },
        })
    }

    async fn log_preview(&self, staged: &[String]) {
        let mut total_bytes = 0u64;
        for path in staged {
            if let Ok(meta) = tokio::fs::metadata(self.copy.root().join(path)).await {
                total_bytes += meta.len();
            }
        }
        tracing::info!(files = staged.len(), total_bytes, "about to commit");
        for path in staged.iter().take(20) {
            tracing::debug!(path = %path, "staged");
        }
    }
}
