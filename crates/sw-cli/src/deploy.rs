// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `sw deploy`: the full publish-and-deploy pipeline

use clap::Args;
use serde_json::Value;
use sw_core::{Pipeline, RunReport, StepOutcome};
use sw_domain_types::{PublishResult, RollbackResult};

use crate::context::Context;
use crate::ConfigOverrides;

/// Service selection shared by the commands that act on an existing service
#[derive(Args, Debug, Clone, Default)]
pub struct ServiceTarget {
    /// Service name (default: repository name)
    #[arg(long)]
    pub service: Option<String>,
    /// Known service id, tried before the name
    #[arg(long)]
    pub service_id: Option<String>,
    /// Repository name (default: project directory name)
    #[arg(long)]
    pub repo: Option<String>,
}

impl ConfigOverrides for ServiceTarget {
    fn config_overrides(&self) -> Vec<(&'static str, Value)> {
        let mut pairs = Vec::new();
        if let Some(name) = &self.repo {
            pairs.push(("repository.name", Value::from(name.as_str())));
        }
        if let Some(name) = &self.service {
            pairs.push(("service.name", Value::from(name.as_str())));
        }
        if let Some(id) = &self.service_id {
            pairs.push(("service.id", Value::from(id.as_str())));
        }
        pairs
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: ServiceTarget,
    /// Create the repository as private
    #[arg(long)]
    pub private: bool,
    /// Branch to push and deploy
    #[arg(long)]
    pub branch: Option<String>,
    /// Commit message for local changes
    #[arg(long, short = 'm')]
    pub message: Option<String>,
    #[arg(long)]
    pub build_command: Option<String>,
    #[arg(long)]
    pub start_command: Option<String>,
    /// Instance plan, used when the service is created
    #[arg(long)]
    pub plan: Option<String>,
    /// Region, used when the service is created
    #[arg(long)]
    pub region: Option<String>,
    /// Runtime (python, node, ruby, go, rust, elixir, docker)
    #[arg(long)]
    pub runtime: Option<String>,
    /// Return once the deploy is triggered
    #[arg(long)]
    pub no_wait: bool,
    /// Do not roll back when the deploy fails
    #[arg(long)]
    pub no_rollback: bool,
    /// Redeploy what is already pushed without touching the working copy
    #[arg(long)]
    pub skip_publish: bool,
    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConfigOverrides for DeployArgs {
    fn config_overrides(&self) -> Vec<(&'static str, Value)> {
        let mut pairs = self.target.config_overrides();
        let strings = [
            ("repository.branch", &self.branch),
            ("repository.commit-message", &self.message),
            ("service.build-command", &self.build_command),
            ("service.start-command", &self.start_command),
            ("service.plan", &self.plan),
            ("service.region", &self.region),
            ("service.runtime", &self.runtime),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                pairs.push((key, Value::from(value.as_str())));
            }
        }
        if self.private {
            pairs.push(("repository.private", Value::from(true)));
        }
        if self.no_wait {
            pairs.push(("deploy.wait", Value::from(false)));
        }
        if self.no_rollback {
            pairs.push(("deploy.rollback", Value::from(false)));
        }
        pairs
    }
}

impl DeployArgs {
    pub async fn run(self, ctx: &Context) -> anyhow::Result<i32> {
        let mut config = ctx.pipeline_config()?;
        config.skip_publish = self.skip_publish;

        let pipeline = Pipeline::new(ctx.hosts()?, ctx.source_credential(), ctx.deploy_credential());
        let report = pipeline.run(&config).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(report.exit_code())
    }
}

fn print_report(report: &RunReport) {
    for step in &report.steps {
        match &step.outcome {
            StepOutcome::Succeeded => println!("  ok    {}", step.step),
            StepOutcome::Failed { kind, message } => {
                println!("  FAIL  {} ({}): {}", step.step, kind, message)
            }
            StepOutcome::Skipped { reason } => println!("  skip  {} ({})", step.step, reason),
        }
    }
    println!();

    if let Some(repository) = &report.repository {
        println!("Repository: {}", repository.html_url);
    }
    match &report.publish {
        Some(PublishResult::Published { commit, branch, files }) => {
            println!("Pushed:     {} to {} ({} files)", short(commit), branch, files)
        }
        Some(PublishResult::PushedPending { branch }) => println!("Pushed:     pending commits to {}", branch),
        Some(PublishResult::NoOp) => println!("Pushed:     nothing to publish"),
        None => {}
    }
    if let Some(service) = &report.service {
        let action = format!("{:?}", service.action).to_lowercase();
        println!("Service:    {} ({}, {})", service.descriptor.name, service.descriptor.id, action);
        if let Some(url) = &service.descriptor.dashboard_url {
            println!("Dashboard:  {}", url);
        }
    }
    if let Some(deploy) = &report.deploy {
        println!(
            "Deploy:     {} {}",
            deploy.id.as_deref().unwrap_or("(not accepted)"),
            deploy.status
        );
    }
    match &report.rollback {
        Some(RollbackResult::RolledBack { target_deploy_id, .. }) => {
            println!("Rollback:   requested, back to {}", target_deploy_id)
        }
        Some(RollbackResult::Unsupported { reason }) => println!("Rollback:   unsupported, {}", reason),
        None => {}
    }
    if let Some(url) = &report.live_url {
        println!("Live at:    {}", url);
    }
    if let Some(err) = &report.error {
        println!();
        println!("Failed: {}", err);
    }
}

fn short(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}
