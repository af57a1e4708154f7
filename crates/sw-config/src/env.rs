// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Environment and command-line overlays

use anyhow::Result;
use serde_json::Value as J;

pub const ENV_PREFIX: &str = "SHIPWRIGHT";

/// Overlay built from `SHIPWRIGHT_*` variables
///
/// A double underscore separates the section from the key and single
/// underscores become dashes: `SHIPWRIGHT_SERVICE__BUILD_COMMAND=make` sets
/// `service.build-command`. Numbers and booleans are parsed.
pub fn env_overlay() -> Result<J> {
    env_overlay_with_prefix(ENV_PREFIX)
}

pub fn env_overlay_with_prefix(prefix: &str) -> Result<J> {
    let built = config::Config::builder()
        .add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let raw = serde_json::to_value(built.try_deserialize::<serde_json::Map<String, J>>()?)?;
    Ok(kebab_keys(raw))
}

fn kebab_keys(value: J) -> J {
    match value {
        J::Object(map) => J::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase().replace('_', "-"), kebab_keys(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Overlay built from explicit command-line flags (`dotted.key`, value)
pub fn flags_overlay(pairs: &[(&str, J)]) -> J {
    let mut root = serde_json::json!({});
    for (k, v) in pairs {
        crate::merge::insert_dotted(&mut root, k, v.clone());
    }
    root
}
