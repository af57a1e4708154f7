// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Logging setup for Shipwright
//!
//! Every binary initializes `tracing` through this crate so that verbosity,
//! output format and log-file placement behave the same everywhere.
//! `RUST_LOG` always wins over the level chosen on the command line.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// Re-export Level for convenience
pub use tracing::Level;

/// Output format for log messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable plaintext format
    #[default]
    Plaintext,
    /// Structured JSON format
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Plaintext => write!(f, "plaintext"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Log level accepted on the command line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CliLogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

/// Logging flags, meant to be used with `#[command(flatten)]`
///
/// Logs go to the console unless `--log-file` or `--log-dir` is given, in
/// which case they are appended to a file (the deploy log).
#[derive(Clone, Debug, Default, clap::Args, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliLoggingArgs {
    /// Log verbosity level
    #[arg(long, value_enum, global = true, help = "Log verbosity level (default: info)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<CliLogLevel>,

    /// Log output format
    #[arg(long, value_enum, global = true, help = "Log output format (default: plaintext)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<LogFormat>,

    /// Directory for log files
    #[arg(long, global = true, help = "Directory for log files")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Log filename
    #[arg(long, global = true, help = "Append logs to this file instead of the console")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl CliLoggingArgs {
    /// Initialize the global subscriber from the parsed flags
    pub fn init(&self, component: &str) -> anyhow::Result<()> {
        let level = self.log_level.unwrap_or_default().into();
        let format = self.log_format.unwrap_or_default();

        match self.resolve_log_path(component) {
            Some(path) => init_to_file(component, level, format, &path),
            None => init(component, level, format),
        }
    }

    /// Where file logging should go, or `None` for console logging
    ///
    /// 1. An absolute `--log-file` is used as is
    /// 2. A relative `--log-file` is placed under `--log-dir` when given
    /// 3. `--log-dir` alone yields `<dir>/<component>.log`
    pub fn resolve_log_path(&self, component: &str) -> Option<PathBuf> {
        match (&self.log_file, &self.log_dir) {
            (Some(file), _) if Path::new(file).is_absolute() => Some(PathBuf::from(file)),
            (Some(file), Some(dir)) => Some(Path::new(dir).join(file)),
            (Some(file), None) => Some(PathBuf::from(file)),
            (None, Some(dir)) => Some(Path::new(dir).join(format!("{}.log", component))),
            (None, None) => None,
        }
    }
}

/// Initialize console logging
pub fn init(component: &str, default_level: Level, format: LogFormat) -> anyhow::Result<()> {
    init_with_writer(component, default_level, format, io::stderr)
}

/// Initialize logging appended to `log_path`, creating parent directories
pub fn init_to_file(
    component: &str,
    default_level: Level,
    format: LogFormat,
    log_path: &Path,
) -> anyhow::Result<()> {
    use std::fs;

    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let log_file = fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    init_with_writer(component, default_level, format, std::sync::Mutex::new(log_file))
}

/// Initialize logging with a custom writer
pub fn init_with_writer<W>(
    component: &str,
    default_level: Level,
    format: LogFormat,
    writer: W,
) -> anyhow::Result<()>
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(component, default_level)));

    match format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).json();
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        LogFormat::Plaintext => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_target(false);
            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
    }

    Ok(())
}

/// Filter directive used when `RUST_LOG` is unset
///
/// Dependencies stay at `warn` so HTTP client chatter does not drown the
/// pipeline's step log.
fn default_filter(component: &str, level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    for target in [component, "sw_cli", "sw_core", "sw_repo", "sw_credentials", "sw_rest_client"] {
        directives.push(format!("{}={}", target.replace('-', "_"), level));
    }
    directives.join(",")
}

/// Extension trait for adding component and operation fields to spans
pub trait TracingExt {
    fn component(self, component: &str) -> Self;
    fn operation(self, operation: &str) -> Self;
}

impl TracingExt for tracing::Span {
    fn component(self, component: &str) -> Self {
        self.record("component", component);
        self
    }

    fn operation(self, operation: &str) -> Self {
        self.record("operation", operation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_log_level_conversion() {
        assert_eq!(Level::from(CliLogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(CliLogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(CliLogLevel::Info), Level::INFO);
        assert_eq!(Level::from(CliLogLevel::Debug), Level::DEBUG);
        assert_eq!(Level::from(CliLogLevel::Trace), Level::TRACE);
        assert_eq!(CliLogLevel::default(), CliLogLevel::Info);
    }

    #[test]
    fn test_console_by_default() {
        let args = CliLoggingArgs::default();
        assert!(args.resolve_log_path("sw").is_none());
    }

    #[test]
    fn test_log_path_resolution() {
        let dir_only = CliLoggingArgs {
            log_dir: Some("/var/log/sw".to_string()),
            ..Default::default()
        };
        assert_eq!(
            dir_only.resolve_log_path("sw"),
            Some(PathBuf::from("/var/log/sw/sw.log"))
        );

        let file_in_dir = CliLoggingArgs {
            log_dir: Some("/var/log/sw".to_string()),
            log_file: Some("deploy_log.txt".to_string()),
            ..Default::default()
        };
        assert_eq!(
            file_in_dir.resolve_log_path("sw"),
            Some(PathBuf::from("/var/log/sw/deploy_log.txt"))
        );

        let absolute = CliLoggingArgs {
            log_dir: Some("/ignored".to_string()),
            log_file: Some("/tmp/deploy.log".to_string()),
            ..Default::default()
        };
        assert_eq!(
            absolute.resolve_log_path("sw"),
            Some(PathBuf::from("/tmp/deploy.log"))
        );
    }

    #[test]
    fn test_default_filter_covers_pipeline_crates() {
        let filter = default_filter("sw", Level::DEBUG);
        assert!(filter.starts_with("warn,sw=DEBUG"));
        assert!(filter.contains("sw_core=DEBUG"));
        assert!(filter.contains("sw_repo=DEBUG"));
    }

    #[test]
    fn test_tracing_ext() {
        let span = tracing::info_span!("step", component = tracing::field::Empty, operation = tracing::field::Empty);
        let span = span.component("sw-repo").operation("publish");
        let _enter = span.enter();
    }
}
