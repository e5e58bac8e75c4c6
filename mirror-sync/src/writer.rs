//! Commit writer: materialises a [`DeltaPlan`] as synthetic commits.
//!
//! ## Per-commit protocol
//!
//! 1. Append `"<day> <i>/<n>"` to [`ACTIVITY_FILE`] in the work tree.
//! 2. Stage everything.
//! 3. Commit as the mirror identity, author and committer time both at noon
//!    UTC of the day.
//!
//! The appended line makes every commit's tree unique. Identical trees with
//! identical parent, identity and timestamp would otherwise hash to the same
//! commit and silently under-count.

use std::fs::OpenOptions;
use std::io::Write;

use mirror_core::{canonical_timestamp, Day, DeltaPlan, Identity, PlanEntry};

use crate::error::{GitError, SyncError};
use crate::git::GitRepo;

/// Payload file that receives one line per synthetic commit.
pub const ACTIVITY_FILE: &str = "ACTIVITY.log";

/// Outcome of applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Days fully applied, in the order they were written.
    pub applied: Vec<PlanEntry>,
    /// Hashes of every commit created, oldest first.
    pub commits: Vec<String>,
}

impl ApplyReport {
    pub fn created(&self) -> usize {
        self.commits.len()
    }
}

/// Create every commit in `plan`, day by day in plan order.
///
/// The first failure aborts the remaining plan and is returned as
/// [`SyncError::Write`]; commits already created stay in history and the
/// failing day is not reported as applied.
pub fn apply(repo: &GitRepo, plan: &DeltaPlan, identity: &Identity) -> Result<ApplyReport, SyncError> {
    let mut report = ApplyReport::default();
    for entry in plan.iter() {
        for index in 1..=entry.count {
            let hash = write_commit(repo, entry.day, index, entry.count, identity).map_err(
                |source| SyncError::Write {
                    day: entry.day,
                    index,
                    committed: index - 1,
                    source,
                },
            )?;
            report.commits.push(hash);
        }
        tracing::info!(day = %entry.day, count = entry.count, "applied day");
        report.applied.push(*entry);
    }
    Ok(report)
}

fn write_commit(
    repo: &GitRepo,
    day: Day,
    index: u32,
    count: u32,
    identity: &Identity,
) -> Result<String, GitError> {
    let path = repo.path().join(ACTIVITY_FILE);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| GitError::Io {
            path: path.clone(),
            source: e,
        })?;
    writeln!(file, "{day} {index}/{count}").map_err(|e| GitError::Io {
        path: path.clone(),
        source: e,
    })?;
    drop(file);

    repo.commit_all(
        &format!("mirror: {day} ({index}/{count})"),
        identity,
        canonical_timestamp(day),
    )
}
