// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! TOML loading and JSON validation

use anyhow::{Context, Result};
use serde_json::Value as J;
use std::path::Path;

/// Parse a TOML document into JSON for validation and merging
pub fn parse_toml_to_json(toml_str: &str) -> Result<J> {
    let toml: toml::Value = toml_str.parse::<toml::Value>()?;
    Ok(serde_json::to_value(toml)?)
}

/// JSON schema of [`crate::ShipwrightConfig`]
pub fn schema() -> J {
    let root = schemars::schema_for!(crate::types::ShipwrightConfig);
    serde_json::to_value(root).unwrap_or(J::Null)
}

/// Validate a (partial) configuration document against the schema
pub fn validate_against_schema(v: &J) -> Result<()> {
    use jsonschema::{Draft, JSONSchema};

    let schema = schema();
    let validator = JSONSchema::options()
        .with_draft(Draft::Draft202012)
        .compile(&schema)
        .map_err(|e| anyhow::anyhow!("config schema failed to compile: {}", e))?;

    if let Err(errors) = validator.validate(v) {
        let error_msg = errors
            .map(|e| format!("{} (at '{}')", e, e.instance_path))
            .collect::<Vec<_>>()
            .join("\n  - ");
        anyhow::bail!("Config schema validation failed:\n  - {}", error_msg);
    }

    Ok(())
}

/// Read and validate one configuration file
pub fn read_layer_from_file(path: &Path) -> Result<J> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading config file {:?}", path))?;

    let json = parse_toml_to_json(&content).with_context(|| format!("parsing {:?}", path))?;
    validate_against_schema(&json).with_context(|| format!("validating {:?}", path))?;

    Ok(json)
}
