//! Scoped working directory for one sync run.
//!
//! A temporary workdir is removed when the [`Workdir`] is dropped, on every
//! exit path, unless [`Workdir::keep`] is called. A local workdir belongs to
//! the caller and is never removed.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use mirror_core::Identity;

use crate::error::{io_err, SyncError};
use crate::git::{redact, GitRepo};

/// Remote name used for the mirror.
pub const ORIGIN: &str = "origin";

#[derive(Debug)]
pub struct Workdir {
    path: PathBuf,
    temp: Option<TempDir>,
}

impl Workdir {
    /// Fresh `mirror-*` directory under the system temp dir.
    pub fn temp() -> Result<Self, SyncError> {
        let dir = tempfile::Builder::new()
            .prefix("mirror-")
            .tempdir()
            .map_err(|e| io_err(std::env::temp_dir(), e))?;
        Ok(Self {
            path: dir.path().to_path_buf(),
            temp: Some(dir),
        })
    }

    /// Caller-owned directory, created if absent.
    pub fn local(path: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let path = path.into();
        std::fs::create_dir_all(&path).map_err(|e| io_err(&path, e))?;
        Ok(Self { path, temp: None })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    /// Retain the directory past this value's lifetime and return its path.
    pub fn keep(mut self) -> PathBuf {
        if let Some(dir) = self.temp.take() {
            let path = dir.keep();
            tracing::warn!(path = %path.display(), "keeping working directory");
            return path;
        }
        self.path.clone()
    }
}

/// Make the workdir a clone of `remote_url` on `branch`.
///
/// - existing work tree: `pull --rebase` when the remote has any branch;
/// - remote has history: clone it;
/// - otherwise: `init` with `branch` and add `remote_url` as `origin`.
pub fn prepare(
    workdir: &Workdir,
    remote_url: &str,
    branch: &str,
    identity: &Identity,
) -> Result<GitRepo, SyncError> {
    let remote_has_history = GitRepo::remote_has_heads(remote_url)?;

    if GitRepo::is_work_tree(workdir.path()) {
        let repo = GitRepo::open(workdir.path())?;
        if remote_has_history {
            let current = repo.current_branch()?;
            tracing::info!(branch = %current, "pulling existing clone");
            repo.pull_rebase(ORIGIN, &current, identity)?;
        }
        return Ok(repo);
    }

    if remote_has_history {
        tracing::info!(remote = %redact(remote_url), "cloning mirror");
        return Ok(GitRepo::clone_from(remote_url, workdir.path())?);
    }

    tracing::info!(remote = %redact(remote_url), branch, "initialising empty mirror");
    let repo = GitRepo::init(workdir.path(), branch)?;
    repo.add_remote(ORIGIN, remote_url)?;
    Ok(repo)
}

/// Repository with no history and no remote, for previews of a full reset.
pub fn prepare_empty(workdir: &Workdir, branch: &str) -> Result<GitRepo, SyncError> {
    Ok(GitRepo::init(workdir.path(), branch)?)
}
