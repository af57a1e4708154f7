// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `sw purge-secret`: rewrite history to drop a committed secret

use clap::Args;
use sw_core::{PipelineError, PipelineStep};
use sw_repo::{purge_from_history, WorkingCopy};

use crate::context::Context;

#[derive(Args, Debug, Clone, Default)]
pub struct PurgeArgs {
    /// File to remove from every commit, relative to the project
    pub path: String,
    /// Confirm the history rewrite
    #[arg(long)]
    pub yes: bool,
}

impl PurgeArgs {
    pub async fn run(self, ctx: &Context) -> anyhow::Result<i32> {
        if !self.yes {
            anyhow::bail!(
                "refusing to rewrite the history of {} without --yes; every commit hash will change",
                ctx.project_root.display()
            );
        }

        let copy = WorkingCopy::new(&ctx.project_root);
        purge_from_history(&copy, &self.path)
            .await
            .map_err(|e| PipelineError::from_vcs(PipelineStep::LinkWorkingCopy, &e))?;

        println!("Removed {} from history.", self.path);
        println!("Rotate the secret, then force-push every branch to replace the remote history.");
        Ok(0)
    }
}
