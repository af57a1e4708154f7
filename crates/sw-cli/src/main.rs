// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::process::ExitCode;

use sw_cli::{exit_code_for, Cli, Parser, EXIT_USAGE};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = cli.logging.init("sw") {
        eprintln!("error: cannot initialize logging: {err:#}");
        return ExitCode::from(EXIT_USAGE as u8);
    }

    let code = match cli.run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code_for(&err)
        }
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
