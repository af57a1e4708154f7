// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `sw verify`: check both credentials without changing anything

use clap::Args;
use sw_core::PipelineError;
use sw_credentials::{validate, validate_deploy_key};

use crate::context::Context;

#[derive(Args, Debug, Clone, Default)]
pub struct VerifyArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl VerifyArgs {
    pub async fn run(self, ctx: &Context) -> anyhow::Result<i32> {
        let source = ctx.source_host()?;
        let deploy = ctx.deploy_host()?;

        let identity = validate(source.as_ref(), &ctx.source_credential())
            .await
            .map_err(|e| PipelineError::from_credentials(&e))?;
        let owners = validate_deploy_key(deploy.as_ref(), &ctx.deploy_credential())
            .await
            .map_err(|e| PipelineError::from_credentials(&e))?;

        if self.json {
            let owners: Vec<_> = owners
                .iter()
                .map(|o| serde_json::json!({ "id": o.id, "name": o.name }))
                .collect();
            let out = serde_json::json!({ "login": identity.login, "owners": owners });
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            println!("GitHub: authenticated as {}", identity.login);
            match owners.as_slice() {
                [] => println!("Render: key accepted, but it lists no owners"),
                owners => {
                    println!("Render: key accepted");
                    for owner in owners {
                        println!("  owner {} ({})", owner.id, owner.name);
                    }
                }
            }
        }
        Ok(0)
    }
}
