// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Layered configuration for Shipwright
//!
//! Configuration is assembled from TOML files, `SHIPWRIGHT_*` environment
//! variables and command-line flags. Every layer is converted to JSON, file
//! layers are validated against the schema derived from
//! [`ShipwrightConfig`], the layers are deep-merged and the result is
//! deserialized into the typed view.
//!
//! Precedence, lowest first: user < project < env < `--config` file < flags.

pub mod env;
pub mod loader;
pub mod merge;
pub mod paths;
pub mod types;

pub use types::*;

use anyhow::{Context, Result};
use serde_json::Value as J;

/// Configuration layer origin, in precedence order
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Scope {
    User,
    Project,
    Env,
    CliConfig,
    Flags,
}

/// Merged configuration together with the layers that contributed to it
#[derive(Debug)]
pub struct Resolved {
    pub json: J,
    pub scopes: Vec<Scope>,
}

/// Load and merge every configuration layer
///
/// The user and project files are optional; a `--config` file that does not
/// exist is an error.
pub fn load_all(paths: &paths::Paths, flags: &[(&str, J)]) -> Result<Resolved> {
    let mut json = serde_json::json!({});
    let mut scopes = Vec::new();

    let user_layer = paths
        .user
        .exists()
        .then(|| loader::read_layer_from_file(&paths.user))
        .transpose()?;
    let project_layer = paths
        .project
        .as_ref()
        .filter(|p| p.exists())
        .map(|p| loader::read_layer_from_file(p))
        .transpose()?;
    let env_layer = env::env_overlay().context("reading SHIPWRIGHT_* environment")?;
    let cli_config_layer = paths
        .cli_config
        .as_ref()
        .map(|p| loader::read_layer_from_file(p))
        .transpose()?;
    let flags_layer = env::flags_overlay(flags);

    let layers = [
        (user_layer, Scope::User),
        (project_layer, Scope::Project),
        (Some(env_layer), Scope::Env),
        (cli_config_layer, Scope::CliConfig),
        (Some(flags_layer), Scope::Flags),
    ];

    for (layer, scope) in layers {
        let Some(layer) = layer else { continue };
        if layer.as_object().is_some_and(|m| m.is_empty()) {
            continue;
        }
        merge::merge_two_json(&mut json, layer);
        scopes.push(scope);
    }

    Ok(Resolved { json, scopes })
}

/// Validate the merged document and extract the typed configuration
pub fn extract(resolved: &Resolved) -> Result<ShipwrightConfig> {
    loader::validate_against_schema(&resolved.json)?;
    serde_path_to_error::deserialize(resolved.json.clone())
        .map_err(|e| anyhow::anyhow!("invalid configuration at '{}': {}", e.path(), e.inner()))
}

/// Load, merge and extract in one step
pub fn load(paths: &paths::Paths, flags: &[(&str, J)]) -> Result<ShipwrightConfig> {
    extract(&load_all(paths, flags)?)
}
