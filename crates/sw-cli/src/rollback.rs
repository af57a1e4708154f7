// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `sw rollback`: manual best-effort rollback

use clap::Args;
use sw_core::{DeployController, ErrorKind, PipelineError, PipelineStep};
use sw_domain_types::RollbackResult;

use crate::context::Context;
use crate::deploy::ServiceTarget;

#[derive(Args, Debug, Clone, Default)]
pub struct RollbackArgs {
    #[command(flatten)]
    pub target: ServiceTarget,
}

impl RollbackArgs {
    pub async fn run(self, ctx: &Context) -> anyhow::Result<i32> {
        let config = ctx.pipeline_config()?;
        let host = ctx.deploy_host()?;
        let service = ctx.existing_service(host.clone(), &config).await?;

        let controller = DeployController::new(host, config.retry.clone(), config.poll_interval, config.timeout);
        let failed = |e: sw_core::CoreError| {
            PipelineError::new(PipelineStep::Rollback, ErrorKind::RollbackFailed, e.to_string())
        };

        // The newest deploy is what is being replaced, successful or not
        let current = controller
            .recent_deploys(&service.id, 1)
            .await
            .map_err(failed)?
            .into_iter()
            .next()
            .map(|d| d.id);

        match controller
            .rollback(&service.id, current.as_deref())
            .await
            .map_err(failed)?
        {
            RollbackResult::RolledBack {
                record,
                target_deploy_id,
            } => {
                println!(
                    "Rollback of {} requested: deploy {} restores {}",
                    service.name,
                    record.id.as_deref().unwrap_or("-"),
                    target_deploy_id
                );
                Ok(0)
            }
            RollbackResult::Unsupported { reason } => Err(PipelineError::new(
                PipelineStep::Rollback,
                ErrorKind::RollbackUnsupported,
                reason.to_string(),
            )
            .into()),
        }
    }
}
