// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::path::PathBuf;

use clap::Subcommand;
use serde_json::Value;
use sw_core::PipelineError;
use sw_logging::CliLoggingArgs;

pub use clap::Parser;

pub mod check;
pub mod context;
pub mod deploy;
pub mod purge;
pub mod rollback;
pub mod status;
pub mod verify;

use context::Context;

/// Exit status for errors that are not classified pipeline failures
pub const EXIT_USAGE: i32 = 2;

/// Subcommand flags that map onto configuration keys
pub trait ConfigOverrides {
    /// `(dotted.key, value)` pairs for the flags that were given
    fn config_overrides(&self) -> Vec<(&'static str, Value)>;
}

#[derive(clap::Parser)]
#[command(
    name = "sw",
    about = "Publish a project to GitHub and deploy it on Render",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Project directory (default: current directory)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
    /// Extra configuration file, applied above the user and project files
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// GitHub token with the `repo` scope
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub github_token: Option<String>,
    /// Render API key
    #[arg(long, env = "RENDER_API_KEY", hide_env_values = true, global = true)]
    pub render_api_key: Option<String>,
    #[command(flatten)]
    pub logging: CliLoggingArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish the project and deploy it
    Deploy(deploy::DeployArgs),
    /// Validate both credentials
    Verify(verify::VerifyArgs),
    /// Report whether secrets are kept out of version control
    Check(check::CheckArgs),
    /// Roll a service back to its previous successful deploy
    Rollback(rollback::RollbackArgs),
    /// Show a service and its latest deploys
    Status(status::StatusArgs),
    /// Remove a file from the entire git history
    PurgeSecret(purge::PurgeArgs),
}

impl Cli {
    fn overrides(&self) -> Vec<(&'static str, Value)> {
        match &self.command {
            Commands::Deploy(args) => args.config_overrides(),
            Commands::Rollback(args) => args.target.config_overrides(),
            Commands::Status(args) => args.target.config_overrides(),
            Commands::Verify(_) | Commands::Check(_) | Commands::PurgeSecret(_) => Vec::new(),
        }
    }

    /// Run the selected subcommand and return the process exit status
    pub async fn run(self) -> anyhow::Result<i32> {
        let ctx = Context::load(
            self.project.as_deref(),
            self.config.as_deref(),
            self.github_token.clone(),
            self.render_api_key.clone(),
            &self.overrides(),
        )?;
        match self.command {
            Commands::Deploy(args) => args.run(&ctx).await,
            Commands::Verify(args) => args.run(&ctx).await,
            Commands::Check(args) => args.run(&ctx).await,
            Commands::Rollback(args) => args.run(&ctx).await,
            Commands::Status(args) => args.run(&ctx).await,
            Commands::PurgeSecret(args) => args.run(&ctx).await,
        }
    }
}

/// Exit status for an error that escaped a subcommand
///
/// Classified pipeline failures carry their own status; anything else is a
/// configuration or usage problem.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PipelineError>()
        .map_or(EXIT_USAGE, PipelineError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_core::{ErrorKind, PipelineStep};

    #[test]
    fn test_parse_deploy_flags() {
        let cli = Cli::try_parse_from([
            "sw",
            "--project",
            "/work/shop",
            "deploy",
            "--repo",
            "shop",
            "--no-wait",
            "--skip-publish",
        ])
        .unwrap();
        assert_eq!(cli.project, Some(PathBuf::from("/work/shop")));
        let Commands::Deploy(args) = &cli.command else {
            panic!("expected deploy");
        };
        assert!(args.skip_publish);
        let overrides = cli.overrides();
        assert!(overrides.contains(&("repository.name", Value::from("shop"))));
        assert!(overrides.contains(&("deploy.wait", Value::from(false))));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sw", "status", "--project", "/work/shop", "--log-level", "debug"])
            .unwrap();
        assert_eq!(cli.project, Some(PathBuf::from("/work/shop")));
        assert!(cli.logging.log_level.is_some());
    }

    #[test]
    fn test_purge_requires_a_path() {
        assert!(Cli::try_parse_from(["sw", "purge-secret"]).is_err());
        assert!(Cli::try_parse_from(["sw", "purge-secret", ".env", "--yes"]).is_ok());
    }

    #[test]
    fn test_exit_code_for_errors() {
        let classified = anyhow::Error::from(PipelineError::new(
            PipelineStep::Rollback,
            ErrorKind::RollbackUnsupported,
            "no previous successful deploy exists",
        ));
        assert_eq!(exit_code_for(&classified), 18);
        assert_eq!(exit_code_for(&anyhow::anyhow!("bad config")), EXIT_USAGE);
    }
}
