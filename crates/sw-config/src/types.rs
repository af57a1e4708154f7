// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Typed configuration sections
//!
//! [`ShipwrightConfig`] is both the schema every layer is validated against
//! and the typed view handed to the rest of the workspace. Every field has a
//! default, so an empty layer stack yields a usable configuration; only the
//! repository name must be known before a run, and callers fall back to the
//! project directory name for it.
//!
//! Credentials are deliberately absent: they only arrive through flags or
//! their environment fallbacks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ShipwrightConfig {
    #[serde(default)]
    pub repository: RepositorySection,
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub deploy: DeploySection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub git: GitSection,
    #[serde(default)]
    pub api: ApiSection,
}

/// Remote source repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RepositorySection {
    /// Repository name; defaults to the project directory name
    pub name: Option<String>,
    #[serde(default)]
    pub private: bool,
    pub description: Option<String>,
    /// Branch that is pushed and deployed
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            name: None,
            private: false,
            description: None,
            branch: default_branch(),
            commit_message: default_commit_message(),
        }
    }
}

/// Language runtime of the hosted web service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Runtime {
    #[default]
    Python,
    Node,
    Ruby,
    Go,
    Rust,
    Elixir,
    Docker,
}

impl Runtime {
    pub fn as_str(self) -> &'static str {
        match self {
            Runtime::Python => "python",
            Runtime::Node => "node",
            Runtime::Ruby => "ruby",
            Runtime::Go => "go",
            Runtime::Rust => "rust",
            Runtime::Elixir => "elixir",
            Runtime::Docker => "docker",
        }
    }
}

/// Hosted web service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ServiceSection {
    /// Service name; defaults to the repository name
    pub name: Option<String>,
    /// Known service id, looked up before falling back to the name
    pub id: Option<String>,
    /// Owner (workspace) to create the service under; defaults to the first
    /// owner the API key can see
    pub owner_id: Option<String>,
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default = "default_build_command")]
    pub build_command: String,
    #[serde(default = "default_start_command")]
    pub start_command: String,
    /// Let the host deploy on every push as well; off so that each run
    /// produces exactly one deploy
    #[serde(default)]
    pub auto_deploy: bool,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: None,
            id: None,
            owner_id: None,
            plan: default_plan(),
            region: default_region(),
            runtime: Runtime::default(),
            build_command: default_build_command(),
            start_command: default_start_command(),
            auto_deploy: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DeploySection {
    /// Wait for the deploy to finish (and roll back on failure)
    #[serde(default = "default_true")]
    pub wait: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Attempt a rollback when the deploy fails
    #[serde(default = "default_true")]
    pub rollback: bool,
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            wait: true,
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
            rollback: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WaitKind {
    Fixed,
    #[default]
    Exponential,
}

/// Retry policy for idempotent remote calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    #[schemars(range(min = 1, max = 20))]
    pub max_attempts: u32,
    #[serde(default)]
    pub wait: WaitKind,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            wait: WaitKind::default(),
            initial_delay_ms: default_initial_delay(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay(),
        }
    }
}

/// Local git behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GitSection {
    /// Patterns that must never be committed
    #[serde(default = "default_secret_patterns")]
    pub secret_patterns: Vec<String>,
    /// Commit identity, only applied when the repository has none configured
    #[serde(default = "default_user_name")]
    pub user_name: String,
    #[serde(default = "default_user_email")]
    pub user_email: String,
}

impl Default for GitSection {
    fn default() -> Self {
        Self {
            secret_patterns: default_secret_patterns(),
            user_name: default_user_name(),
            user_email: default_user_email(),
        }
    }
}

/// API endpoints, overridable for enterprise hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ApiSection {
    #[serde(default = "default_github_url")]
    pub github_url: String,
    #[serde(default = "default_render_url")]
    pub render_url: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            github_url: default_github_url(),
            render_url: default_render_url(),
        }
    }
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_commit_message() -> String {
    "Deploy via shipwright".to_string()
}

fn default_plan() -> String {
    "free".to_string()
}

fn default_region() -> String {
    "oregon".to_string()
}

fn default_build_command() -> String {
    "pip install -r requirements.txt".to_string()
}

fn default_start_command() -> String {
    "gunicorn app:app".to_string()
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    5
}

fn default_timeout() -> u64 {
    15 * 60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_secret_patterns() -> Vec<String> {
    vec![".env".to_string()]
}

fn default_user_name() -> String {
    "Shipwright".to_string()
}

fn default_user_email() -> String {
    "shipwright@localhost".to_string()
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}

fn default_render_url() -> String {
    "https://api.render.com/v1".to_string()
}
