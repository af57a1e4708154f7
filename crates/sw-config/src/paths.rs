// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration file discovery

use std::path::{Path, PathBuf};

pub const PROJECT_CONFIG_FILE: &str = "shipwright.toml";

/// Configuration files, lowest precedence first
#[derive(Debug, Clone)]
pub struct Paths {
    pub user: PathBuf,
    pub project: Option<PathBuf>,
    /// File passed with `--config`
    pub cli_config: Option<PathBuf>,
}

/// Discover configuration files for a project directory
pub fn discover_paths(project_root: Option<&Path>, cli_config: Option<&Path>) -> Paths {
    Paths {
        user: user_config_path(),
        project: project_root.map(|root| root.join(PROJECT_CONFIG_FILE)),
        cli_config: cli_config.map(Path::to_path_buf),
    }
}

fn user_config_path() -> PathBuf {
    let home = || PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".into()));

    if cfg!(target_os = "macos") {
        home()
            .join("Library")
            .join("Application Support")
            .join("shipwright")
            .join("config.toml")
    } else if cfg!(target_os = "windows") {
        PathBuf::from(std::env::var("APPDATA").unwrap_or_else(|_| "C:\\".into()))
            .join("shipwright")
            .join("config.toml")
    } else {
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home().join(".config"))
            .join("shipwright")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_discovery() {
        let paths = discover_paths(Some(Path::new("/work/shop")), Some(Path::new("ci.toml")));
        assert!(paths.user.ends_with("shipwright/config.toml"));
        assert_eq!(paths.project, Some(PathBuf::from("/work/shop/shipwright.toml")));
        assert_eq!(paths.cli_config, Some(PathBuf::from("ci.toml")));
    }

    #[test]
    fn test_no_project() {
        let paths = discover_paths(None, None);
        assert!(paths.project.is_none());
        assert!(paths.cli_config.is_none());
    }
}
