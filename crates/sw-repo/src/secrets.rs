// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Keeping secret files out of version control

use sw_domain_types::SecurityReport;

use crate::error::{VcsError, VcsResult};
use crate::working_copy::{WorkingCopy, REMOTE_NAME};

pub const GITIGNORE: &str = ".gitignore";

/// Outcome of one exclusion pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretExclusion {
    /// Patterns appended to `.gitignore`
    pub ignored: Vec<String>,
    /// Paths removed from the index
    pub untracked: Vec<String>,
    /// Commit recording the correction, when one was needed
    pub correction_commit: Option<String>,
}

impl SecretExclusion {
    pub fn changed_anything(&self) -> bool {
        !self.ignored.is_empty() || !self.untracked.is_empty()
    }
}

fn lists_pattern(gitignore: &str, pattern: &str) -> bool {
    gitignore.lines().map(str::trim).any(|line| {
        line == pattern
            || line.strip_prefix('/') == Some(pattern)
            || line.strip_prefix("**/") == Some(pattern)
    })
}

async fn read_gitignore(copy: &WorkingCopy) -> VcsResult<String> {
    match tokio::fs::read_to_string(copy.root().join(GITIGNORE)).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

/// Whether `.gitignore` lists `pattern`
pub async fn is_ignored(copy: &WorkingCopy, pattern: &str) -> VcsResult<bool> {
    Ok(lists_pattern(&read_gitignore(copy).await?, pattern))
}

async fn append_to_gitignore(copy: &WorkingCopy, patterns: &[String]) -> VcsResult<()> {
    let mut content = read_gitignore(copy).await?;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    for pattern in patterns {
        content.push_str(pattern);
        content.push('\n');
    }
    tokio::fs::write(copy.root().join(GITIGNORE), content).await?;
    Ok(())
}

/// Tracked files matching any of `patterns`
pub async fn tracked_secrets(copy: &WorkingCopy, patterns: &[String]) -> VcsResult<Vec<String>> {
    let mut tracked = Vec::new();
    if !copy.is_initialized() {
        return Ok(tracked);
    }
    for pattern in patterns {
        for path in copy.files_matching(pattern, true).await? {
            if !tracked.contains(&path) {
                tracked.push(path);
            }
        }
    }
    Ok(tracked)
}

/// Ignore and untrack every file matching `patterns`
///
/// A pattern is added to `.gitignore` only when a matching file exists. When
/// a matching file was tracked it is removed from the index and the
/// correction is committed on its own, ahead of any content commit.
pub async fn exclude_secrets(copy: &WorkingCopy, patterns: &[String]) -> VcsResult<SecretExclusion> {
    let mut outcome = SecretExclusion::default();
    let gitignore = read_gitignore(copy).await?;

    for pattern in patterns {
        let tracked = copy.files_matching(pattern, true).await?;
        let untracked = copy.files_matching(pattern, false).await?;
        if tracked.is_empty() && untracked.is_empty() {
            continue;
        }
        if !lists_pattern(&gitignore, pattern) && !outcome.ignored.contains(pattern) {
            outcome.ignored.push(pattern.clone());
        }
        for path in tracked {
            if !outcome.untracked.contains(&path) {
                outcome.untracked.push(path);
            }
        }
    }

    if !outcome.ignored.is_empty() {
        append_to_gitignore(copy, &outcome.ignored).await?;
        tracing::info!(patterns = ?outcome.ignored, "added secret patterns to .gitignore");
    }

    if !outcome.untracked.is_empty() {
        copy.rm_cached(&outcome.untracked).await?;
        copy.add(&[GITIGNORE]).await?;
        if !copy.staged_files().await?.is_empty() {
            let commit = copy.commit("Stop tracking secret files").await?;
            tracing::warn!(
                files = ?outcome.untracked,
                commit = %commit,
                "secret files were tracked; removed them from the index"
            );
            outcome.correction_commit = Some(commit);
        }
    }

    Ok(outcome)
}

/// Rewrite history so `path` never existed
///
/// Destructive. The `origin` remote is restored afterwards, since
/// `git filter-repo` drops it.
pub async fn purge_from_history(copy: &WorkingCopy, path: &str) -> VcsResult<()> {
    if !copy.is_initialized() {
        return Err(VcsError::NotARepository(copy.root().to_path_buf()));
    }
    let origin = copy.remote_url(REMOTE_NAME).await?;
    copy.filter_repo_remove(path).await?;
    if let Some(url) = origin {
        if copy.remote_url(REMOTE_NAME).await?.is_none() {
            copy.add_remote(REMOTE_NAME, &url).await?;
        }
    }
    tracing::warn!(path, "rewrote history; a force push is required to update the remote");
    Ok(())
}

/// Read-only security findings for the working copy
pub async fn security_report(
    copy: &WorkingCopy,
    patterns: &[String],
    credential_valid: bool,
) -> VcsResult<SecurityReport> {
    let gitignore = read_gitignore(copy).await?;
    Ok(SecurityReport {
        secrets_ignored: patterns.iter().all(|p| lists_pattern(&gitignore, p)),
        credential_valid,
        tracked_secrets: tracked_secrets(copy, patterns).await?,
    })
}
