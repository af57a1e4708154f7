// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Advisory lock that keeps two runs from deploying the same target at once

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::fcntl::{Flock, FlockArg};

use crate::error::{CoreError, CoreResult};

/// Where the lock for `repo`/`service` lives
///
/// Keyed by the deploy target only, so it stays the same whether or not the
/// project has become a working copy yet.
pub fn lock_path(repo: &str, service: &str) -> PathBuf {
    std::env::temp_dir().join(format!("shipwright-{}-{}.lock", sanitize(repo), sanitize(service)))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect()
}

/// Held for the duration of a run; released on drop
pub struct RunLock {
    path: PathBuf,
    #[cfg(unix)]
    _lock: Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl RunLock {
    /// Take the lock without waiting
    pub fn acquire(path: PathBuf) -> CoreResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| CoreError::LockFile {
                path: path.clone(),
                source,
            })?;
        Self::lock(path, file)
    }

    #[cfg(unix)]
    fn lock(path: PathBuf, file: File) -> CoreResult<Self> {
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => {
                tracing::debug!(path = %path.display(), "acquired run lock");
                Ok(Self { path, _lock: lock })
            }
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => Err(CoreError::Locked(path)),
            Err((_, errno)) => Err(CoreError::LockFile {
                path,
                source: std::io::Error::from(errno),
            }),
        }
    }

    #[cfg(not(unix))]
    fn lock(path: PathBuf, file: File) -> CoreResult<Self> {
        tracing::debug!(path = %path.display(), "advisory locking unavailable on this platform");
        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RunLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLock").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_path_is_keyed_by_target() {
        let path = lock_path("shop", "shop/web");
        assert_eq!(path, std::env::temp_dir().join("shipwright-shop-shop_web.lock"));
        assert_ne!(lock_path("shop", "shop-web"), lock_path("shop", "shop-api"));
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_survives_project_becoming_a_working_copy() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().file_name().unwrap().to_string_lossy().to_string();

        let first = RunLock::acquire(lock_path(&name, "web")).unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let err = RunLock::acquire(lock_path(&name, "web")).unwrap_err();
        assert!(matches!(err, CoreError::Locked(_)));
        assert_eq!(first.path(), lock_path(&name, "web").as_path());
    }

    #[cfg(unix)]
    #[test]
    fn test_second_lock_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.lock");

        let first = RunLock::acquire(path.clone()).unwrap();
        let err = RunLock::acquire(path.clone()).unwrap_err();
        assert!(matches!(err, CoreError::Locked(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Locked);

        drop(first);
        assert!(RunLock::acquire(path).is_ok());
    }
}
