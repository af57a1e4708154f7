// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Local git working copy driven through the `git` executable

use std::path::{Path, PathBuf};
use std::process::Output;

use sw_domain_types::WorkingCopyState;
use tokio::process::Command;

use crate::error::{PushErrorCause, VcsError, VcsResult};
use crate::git_auth::GitAuth;

pub const REMOTE_NAME: &str = "origin";

/// A project directory that is (or will become) a git working copy
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    root: PathBuf,
    auth: Option<GitAuth>,
}

impl WorkingCopy {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            auth: None,
        }
    }

    /// Authentication used for network operations (push)
    pub fn with_auth(mut self, auth: GitAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn git_dir(&self) -> PathBuf {
        self.root.join(".git")
    }

    pub fn is_initialized(&self) -> bool {
        self.git_dir().exists()
    }

    /// Recompute the working-copy state from disk
    pub async fn state(&self) -> VcsResult<WorkingCopyState> {
        if !self.is_initialized() {
            return Ok(WorkingCopyState::default());
        }
        Ok(WorkingCopyState {
            initialized: true,
            has_remote: self.remote_url(REMOTE_NAME).await?.is_some(),
            has_pending_changes: self.has_pending_changes().await?,
        })
    }

    async fn output(&self, args: &[&str], env: &[(String, String)]) -> VcsResult<Output> {
        let mut command = Command::new("git");
        command
            .args(args)
            .current_dir(&self.root)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        for (key, value) in env {
            command.env(key, value);
        }

        command.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VcsError::GitNotFound
            } else {
                VcsError::Io(e)
            }
        })
    }

    /// Run git and return trimmed stdout, failing on a non-zero exit
    pub async fn git(&self, args: &[&str]) -> VcsResult<String> {
        let output = self.output(args, &[]).await?;
        if !output.status.success() {
            return Err(VcsError::Command {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run git, returning `None` instead of an error on a non-zero exit
    async fn git_optional(&self, args: &[&str]) -> VcsResult<Option<String>> {
        let output = self.output(args, &[]).await?;
        if !output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!stdout.is_empty()).then_some(stdout))
    }

    pub async fn init(&self) -> VcsResult<()> {
        self.git(&["init"]).await?;
        tracing::info!(path = %self.root.display(), "initialized git repository");
        Ok(())
    }

    /// Effective value of a config key across all scopes
    pub async fn config_get(&self, key: &str) -> VcsResult<Option<String>> {
        self.git_optional(&["config", "--get", key]).await
    }

    /// Set a key in the repository-local config
    pub async fn config_set(&self, key: &str, value: &str) -> VcsResult<()> {
        self.git(&["config", "--local", key, value]).await?;
        Ok(())
    }

    pub async fn remote_url(&self, remote: &str) -> VcsResult<Option<String>> {
        self.git_optional(&["remote", "get-url", remote]).await
    }

    pub async fn add_remote(&self, remote: &str, url: &str) -> VcsResult<()> {
        self.git(&["remote", "add", remote, url]).await?;
        Ok(())
    }

    pub async fn set_remote_url(&self, remote: &str, url: &str) -> VcsResult<()> {
        self.git(&["remote", "set-url", remote, url]).await?;
        Ok(())
    }

    pub async fn has_pending_changes(&self) -> VcsResult<bool> {
        let status = self.git(&["status", "--porcelain"]).await?;
        Ok(!status.is_empty())
    }

    /// Paths matching `pattern` that are tracked (`tracked = true`) or
    /// untracked
    pub async fn files_matching(&self, pattern: &str, tracked: bool) -> VcsResult<Vec<String>> {
        let exclude = format!("--exclude={}", pattern);
        let selector = if tracked { "--cached" } else { "--others" };
        let output = self
            .git(&["ls-files", "-z", selector, "--ignored", &exclude])
            .await?;
        Ok(split_nul(&output))
    }

    /// Stop tracking `paths` without touching the files on disk
    pub async fn rm_cached(&self, paths: &[String]) -> VcsResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["rm", "--cached", "--quiet", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(&args).await?;
        Ok(())
    }

    pub async fn add(&self, paths: &[&str]) -> VcsResult<()> {
        let mut args = vec!["add", "--"];
        args.extend_from_slice(paths);
        self.git(&args).await?;
        Ok(())
    }

    /// Stage every change not ignored by `.gitignore`
    pub async fn add_all(&self) -> VcsResult<()> {
        self.git(&["add", "--all"]).await?;
        Ok(())
    }

    pub async fn staged_files(&self) -> VcsResult<Vec<String>> {
        let output = self
            .git(&["diff", "--cached", "--name-only", "-z", "--no-renames"])
            .await?;
        Ok(split_nul(&output))
    }

    /// Commit the index and return the new commit id
    pub async fn commit(&self, message: &str) -> VcsResult<String> {
        self.git(&["commit", "--quiet", "-m", message]).await?;
        self.git(&["rev-parse", "HEAD"]).await
    }

    pub async fn has_head(&self) -> VcsResult<bool> {
        Ok(self
            .git_optional(&["rev-parse", "--verify", "--quiet", "HEAD"])
            .await?
            .is_some())
    }

    pub async fn current_branch(&self) -> VcsResult<Option<String>> {
        self.git_optional(&["symbolic-ref", "--short", "-q", "HEAD"]).await
    }

    pub async fn branch_exists(&self, branch: &str) -> VcsResult<bool> {
        let reference = format!("refs/heads/{}", branch);
        Ok(self
            .git_optional(&["rev-parse", "--verify", "--quiet", &reference])
            .await?
            .is_some())
    }

    /// `git branch -M <branch>`
    pub async fn rename_branch(&self, branch: &str) -> VcsResult<()> {
        self.git(&["branch", "-M", branch]).await?;
        Ok(())
    }

    /// Whether HEAD has commits the remote-tracking branch does not
    ///
    /// Without a remote-tracking ref every local commit counts as unpushed.
    pub async fn has_unpushed_commits(&self, remote: &str, branch: &str) -> VcsResult<bool> {
        if !self.has_head().await? {
            return Ok(false);
        }
        let tracking = format!("refs/remotes/{}/{}", remote, branch);
        if self
            .git_optional(&["rev-parse", "--verify", "--quiet", &tracking])
            .await?
            .is_none()
        {
            return Ok(true);
        }
        let range = format!("{}..HEAD", tracking);
        let count = self.git(&["rev-list", "--count", &range]).await?;
        Ok(count.parse::<u64>().unwrap_or(0) > 0)
    }

    /// Push `branch` to `remote` and set it as upstream
    pub async fn push(&self, remote: &str, branch: &str) -> VcsResult<()> {
        let env = match (&self.auth, self.remote_url(remote).await?) {
            (Some(auth), Some(url)) => auth.env_for(&url),
            _ => Vec::new(),
        };

        let output = self
            .output(&["push", "--porcelain", "-u", remote, branch], &env)
            .await?;
        if output.status.success() {
            tracing::info!(remote, branch, "pushed");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let cause = classify_push_failure(&format!("{}\n{}", stdout, stderr));
        Err(VcsError::Push {
            branch: branch.to_string(),
            cause,
            stderr,
        })
    }

    /// Remove `path` from every commit with `git filter-repo`
    pub async fn filter_repo_remove(&self, path: &str) -> VcsResult<()> {
        if !self.is_initialized() {
            return Err(VcsError::NotARepository(self.root.clone()));
        }
        if self.git_optional(&["filter-repo", "--version"]).await?.is_none() {
            return Err(VcsError::FilterRepoMissing);
        }
        self.git(&["filter-repo", "--invert-paths", "--path", path, "--force"])
            .await?;
        Ok(())
    }
}

fn split_nul(output: &str) -> Vec<String> {
    output
        .split('\0')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Map git's push output onto a failure cause
pub fn classify_push_failure(output: &str) -> PushErrorCause {
    let text = output.to_lowercase();

    const NON_FAST_FORWARD: [&str; 3] = ["non-fast-forward", "fetch first", "[rejected]"];
    const AUTH: [&str; 6] = [
        "authentication failed",
        "could not read username",
        "invalid username or password",
        "permission to",
        "error: 403",
        "error: 401",
    ];
    const NETWORK: [&str; 7] = [
        "could not resolve host",
        "failed to connect",
        "connection timed out",
        "connection refused",
        "operation timed out",
        "the remote end hung up unexpectedly",
        "network is unreachable",
    ];

    if AUTH.iter().any(|needle| text.contains(needle)) {
        PushErrorCause::AuthRejected
    } else if NON_FAST_FORWARD.iter().any(|needle| text.contains(needle)) {
        PushErrorCause::NonFastForward
    } else if NETWORK.iter().any(|needle| text.contains(needle)) {
        PushErrorCause::Network
    } else {
        PushErrorCause::Other
    }
}
