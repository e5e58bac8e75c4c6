//! Error types for mirror-sync.

use std::path::PathBuf;

use thiserror::Error;

use mirror_core::{AccountName, Day, ValidationError};

/// Failure of a single `git` invocation.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` executable could not be started.
    #[error("failed to run git {args}: {source}")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },

    /// git exited non-zero. `args` and `stderr` are already redacted.
    #[error("git {args} failed: {stderr}")]
    Failed { args: String, stderr: String },

    /// Work tree file access (payload file, directory creation).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// git printed something we could not interpret.
    #[error("unexpected git output: {0}")]
    Parse(String),
}

/// Failure of the desired-count data source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("activity source rejected credentials: {0}")]
    Unauthorized(String),

    #[error("activity source rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("account '{0}' not found")]
    UnknownAccount(AccountName),

    /// Response arrived but did not have the expected shape.
    #[error("malformed activity data: {0}")]
    Malformed(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("activity source unavailable: {0}")]
    Unavailable(String),
}

/// All errors that can arise from a sync run.
///
/// Variants identify the phase that failed; [`SyncError::Write`] also names
/// the day and commit index.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed input, rejected before any network or repository access.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Desired counts could not be obtained. Nothing was planned.
    #[error("data source error: {0}")]
    DataSource(#[from] SourceError),

    /// Clone, open, scan or push failed.
    #[error("repository access error: {0}")]
    RepositoryAccess(#[from] GitError),

    /// Creating commit `index` (1-based) of `day` failed after `committed`
    /// commits of that day had landed. Earlier days are intact.
    #[error("failed to write commit {index} for {day} ({committed} already committed that day): {source}")]
    Write {
        day: Day,
        index: u32,
        committed: u32,
        #[source]
        source: GitError,
    },

    /// The mirror remote could not be created or replaced right before the
    /// first commit. Nothing was written.
    #[error("failed to provision mirror repository")]
    Provision(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Working directory could not be acquired.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
