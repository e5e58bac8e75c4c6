//! Sync orchestrator shared by every entry point.
//!
//! Phases run strictly in sequence: desired → actual → plan → apply → push.
//! The actual counts are always re-scanned from the repository, so a partial
//! earlier run, or a commit made by hand, is reflected without double-counting.
//!
//! Anything that changes external state (provisioning the remote, writing,
//! pushing) happens only after the desired counts were fetched and the plan
//! was confirmed.

use mirror_core::{AccountName, ContributionMap, DateRange, DeltaPlan, Identity};

use crate::error::SyncError;
use crate::git::GitRepo;
use crate::source::ActivitySource;
use crate::workdir::ORIGIN;
use crate::{planner, scanner, writer};

/// Whether a run may mutate the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Compute and report the plan; write nothing.
    Preview,
    /// Write the plan and hand off to push.
    Apply,
}

/// Options for one run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub range: DateRange,
    pub mode: SyncMode,
    /// Skip the confirmation callback.
    pub assume_yes: bool,
    /// Push the branch to `origin` after applying.
    pub push: bool,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Previewed,
    UpToDate,
    /// Nothing to write, but commits left by an earlier run whose push
    /// failed were pushed now.
    PushedBacklog { commits: u32 },
    Declined,
    Applied { created: usize, pushed: bool },
}

/// Everything a caller needs to report a run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub range: DateRange,
    pub desired: ContributionMap,
    pub actual: ContributionMap,
    pub plan: DeltaPlan,
    pub outcome: SyncOutcome,
}

/// Run one sync.
///
/// `confirm` is consulted only in apply mode, with a non-empty plan, when
/// `options.assume_yes` is false. Returning `false` ends the run with
/// [`SyncOutcome::Declined`] before anything is written.
pub fn run<S, F>(
    source: &S,
    account: &AccountName,
    repo: &GitRepo,
    identity: &Identity,
    options: &SyncOptions,
    confirm: F,
) -> Result<SyncReport, SyncError>
where
    S: ActivitySource + ?Sized,
    F: FnOnce(&DeltaPlan) -> bool,
{
    run_with(source, account, repo, identity, options, confirm, |_| Ok(()))
}

/// [`run`] with a hook that runs once the plan is confirmed and before the
/// first commit is written, e.g. to create or replace the remote.
///
/// The hook never runs in preview mode, for an empty plan, after a declined
/// confirmation, or when the desired counts could not be fetched.
pub fn run_with<S, F, P>(
    source: &S,
    account: &AccountName,
    repo: &GitRepo,
    identity: &Identity,
    options: &SyncOptions,
    confirm: F,
    before_apply: P,
) -> Result<SyncReport, SyncError>
where
    S: ActivitySource + ?Sized,
    F: FnOnce(&DeltaPlan) -> bool,
    P: FnOnce(&GitRepo) -> Result<(), SyncError>,
{
    let range = options.range;

    let desired = source.desired(account, &range)?.restrict(&range);
    tracing::info!(
        account = %account,
        range = %range,
        days = desired.active_days(),
        total = desired.total(),
        "fetched desired counts"
    );

    let actual = scanner::scan(repo, identity, &range)?;
    let plan = planner::plan(&desired, &actual, &range);
    tracing::info!(
        days = plan.days(),
        commits = plan.total_commits(),
        "planned delta"
    );

    let report = |outcome| SyncReport {
        range,
        desired: desired.clone(),
        actual: actual.clone(),
        plan: plan.clone(),
        outcome,
    };

    if options.mode == SyncMode::Preview {
        return Ok(report(SyncOutcome::Previewed));
    }
    if plan.is_empty() {
        if options.push {
            if let Some(commits) = push_backlog(repo)? {
                return Ok(report(SyncOutcome::PushedBacklog { commits }));
            }
        }
        return Ok(report(SyncOutcome::UpToDate));
    }
    if !options.assume_yes && !confirm(&plan) {
        return Ok(report(SyncOutcome::Declined));
    }

    before_apply(repo)?;
    let applied = writer::apply(repo, &plan, identity)?;

    if options.push {
        let branch = repo.current_branch()?;
        tracing::info!(branch = %branch, "pushing");
        repo.push(ORIGIN, &branch)?;
    }

    Ok(report(SyncOutcome::Applied {
        created: applied.created(),
        pushed: options.push,
    }))
}

/// Push commits that `origin` does not have yet. `None` when there is
/// nothing to push or no `origin`.
fn push_backlog(repo: &GitRepo) -> Result<Option<u32>, SyncError> {
    let branch = repo.current_branch()?;
    match repo.unpushed_commits(ORIGIN, &branch)? {
        Some(commits) if commits > 0 => {
            tracing::info!(branch = %branch, commits, "pushing commits from an earlier run");
            repo.push(ORIGIN, &branch)?;
            Ok(Some(commits))
        }
        _ => Ok(None),
    }
}
