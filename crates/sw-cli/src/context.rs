// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Resolved configuration, credentials and API clients shared by subcommands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde_json::Value;
use sw_config::{paths::discover_paths, ShipwrightConfig};
use sw_core::{ErrorKind, PipelineConfig, PipelineError, PipelineHosts, PipelineStep, ServiceRegistry};
use sw_credentials::{validate_deploy_key, Credential};
use sw_domain_types::ServiceDescriptor;
use sw_rest_client::{BearerToken, DeployHost, GitHubClient, RenderClient, RestClientError, SourceHost};

pub struct Context {
    pub project_root: PathBuf,
    pub config: ShipwrightConfig,
    github_token: String,
    render_api_key: String,
}

impl Context {
    /// Resolve the project directory and load every configuration layer
    ///
    /// Missing credentials are kept as empty strings; validation reports them.
    pub fn load(
        project: Option<&Path>,
        config_file: Option<&Path>,
        github_token: Option<String>,
        render_api_key: Option<String>,
        overrides: &[(&str, Value)],
    ) -> Result<Self> {
        let project_root = match project {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir().context("cannot determine the current directory")?,
        };
        let project_root = project_root
            .canonicalize()
            .with_context(|| format!("project directory {} is not accessible", project_root.display()))?;
        if !project_root.is_dir() {
            anyhow::bail!("{} is not a directory", project_root.display());
        }

        let paths = discover_paths(Some(&project_root), config_file);
        let config = sw_config::load(&paths, overrides).context("loading configuration")?;
        tracing::debug!(project = %project_root.display(), "configuration loaded");

        Ok(Self {
            project_root,
            config,
            github_token: github_token.unwrap_or_default(),
            render_api_key: render_api_key.unwrap_or_default(),
        })
    }

    pub fn source_credential(&self) -> Credential {
        Credential::source_control(self.github_token.clone())
    }

    pub fn deploy_credential(&self) -> Credential {
        Credential::deploy(self.render_api_key.clone())
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig::from_config(&self.config, self.project_root.clone())?)
    }

    pub fn source_host(&self) -> Result<Arc<dyn SourceHost>> {
        let client = GitHubClient::new(&self.config.api.github_url, BearerToken::new(self.github_token.clone()))
            .map_err(client_error)?;
        Ok(Arc::new(client))
    }

    pub fn deploy_host(&self) -> Result<Arc<dyn DeployHost>> {
        let client = RenderClient::new(&self.config.api.render_url, BearerToken::new(self.render_api_key.clone()))
            .map_err(client_error)?;
        Ok(Arc::new(client))
    }

    pub fn hosts(&self) -> Result<PipelineHosts> {
        Ok(PipelineHosts {
            source: self.source_host()?,
            deploy: self.deploy_host()?,
        })
    }

    /// Validate the deploy key and look up the configured service
    pub async fn existing_service(
        &self,
        host: Arc<dyn DeployHost>,
        config: &PipelineConfig,
    ) -> Result<ServiceDescriptor> {
        validate_deploy_key(host.as_ref(), &self.deploy_credential())
            .await
            .map_err(|e| PipelineError::from_credentials(&e))?;

        let registry = ServiceRegistry::new(host, config.retry.clone());
        let found = registry
            .find_service(&config.service_name, config.service_id.as_deref())
            .await
            .map_err(|e| PipelineError::from_core(PipelineStep::EnsureService, &e))?;
        found.ok_or_else(|| {
            PipelineError::new(
                PipelineStep::EnsureService,
                ErrorKind::Provisioning,
                format!("no service named '{}' exists", config.service_name),
            )
            .into()
        })
    }
}

/// A token that cannot even form a header is a credential problem; a bad URL
/// is a configuration one
fn client_error(err: RestClientError) -> anyhow::Error {
    if err.is_auth() {
        PipelineError::new(PipelineStep::ValidateCredentials, ErrorKind::Auth, err.to_string()).into()
    } else {
        anyhow::Error::from(err).context("invalid API endpoint in the `api` section")
    }
}
