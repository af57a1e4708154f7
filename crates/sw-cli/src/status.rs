// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `sw status`: the service and its latest deploys

use clap::Args;
use sw_core::{DeployController, PipelineError, PipelineStep};

use crate::context::Context;
use crate::deploy::ServiceTarget;

#[derive(Args, Debug, Clone, Default)]
pub struct StatusArgs {
    #[command(flatten)]
    pub target: ServiceTarget,
    /// Number of deploys to list
    #[arg(long, default_value_t = 5)]
    pub limit: u32,
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub async fn run(self, ctx: &Context) -> anyhow::Result<i32> {
        let config = ctx.pipeline_config()?;
        let host = ctx.deploy_host()?;
        let service = ctx.existing_service(host.clone(), &config).await?;

        let controller = DeployController::new(host, config.retry.clone(), config.poll_interval, config.timeout);
        let deploys = controller
            .recent_deploys(&service.id, self.limit)
            .await
            .map_err(|e| PipelineError::from_core(PipelineStep::AwaitDeploy, &e))?;

        if self.json {
            let out = serde_json::json!({ "service": service, "deploys": deploys });
            println!("{}", serde_json::to_string_pretty(&out)?);
            return Ok(0);
        }

        println!("Service:    {} ({})", service.name, service.id);
        if let Some(repo) = &service.repository_ref {
            println!(
                "Repository: {} @ {}",
                repo,
                service.branch.as_deref().unwrap_or("-")
            );
        }
        if let Some(url) = &service.live_url {
            println!("URL:        {}", url);
        }
        if let Some(url) = &service.dashboard_url {
            println!("Dashboard:  {}", url);
        }
        println!();
        if deploys.is_empty() {
            println!("No deploys yet");
        }
        for deploy in &deploys {
            let created = deploy
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            println!(
                "  {:<24} {:<10} {}",
                deploy.id,
                deploy.status.to_deploy_status(),
                created
            );
        }
        Ok(0)
    }
}
