// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `sw check`: security pre-flight for the project

use clap::Args;
use sw_core::{PipelineError, PipelineStep};
use sw_credentials::validate;
use sw_domain_types::SecurityReport;
use sw_repo::{security_report, WorkingCopy};

use crate::context::Context;

/// Exit status when the report has findings
pub const EXIT_FINDINGS: i32 = 1;

#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    pub async fn run(self, ctx: &Context) -> anyhow::Result<i32> {
        let source = ctx.source_host()?;
        let credential_valid = match validate(source.as_ref(), &ctx.source_credential()).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "source-control credential is not usable");
                false
            }
        };

        let copy = WorkingCopy::new(&ctx.project_root);
        let report = security_report(&copy, &ctx.config.git.secret_patterns, credential_valid)
            .await
            .map_err(|e| PipelineError::from_vcs(PipelineStep::LinkWorkingCopy, &e))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report, &ctx.config.git.secret_patterns);
        }
        Ok(if report.is_clean() { 0 } else { EXIT_FINDINGS })
    }
}

fn print_report(report: &SecurityReport, patterns: &[String]) {
    let mark = |ok: bool| if ok { "ok  " } else { "FAIL" };
    println!(
        "  {}  secrets are listed in .gitignore ({})",
        mark(report.secrets_ignored),
        patterns.join(", ")
    );
    println!("  {}  GitHub token is valid", mark(report.credential_valid));
    println!(
        "  {}  no secret files are tracked",
        mark(report.tracked_secrets.is_empty())
    );
    for path in &report.tracked_secrets {
        println!("        tracked: {}", path);
    }
    if !report.tracked_secrets.is_empty() {
        println!();
        println!("The next deploy untracks these files. Their contents stay in earlier commits;");
        println!("run `sw purge-secret <path> --yes` and force-push to remove them from history.");
    }
}
