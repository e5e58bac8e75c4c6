use std::cell::Cell;
use std::path::Path;
use std::process::Command;

use mirror_core::{parse_day, AccountName, ContributionMap, DateRange, Day, Identity};
use mirror_sync::{
    pipeline::{self, SyncMode, SyncOptions, SyncOutcome},
    scan,
    workdir::{self, Workdir},
    ActivitySource, GitRepo, SourceError, StaticSource, SyncError,
};
use tempfile::TempDir;

fn identity() -> Identity {
    Identity::new("mirror-bot", "mirror@users.noreply.github.com")
}

fn account() -> AccountName {
    AccountName::from("work-account")
}

fn day(s: &str) -> Day {
    parse_day(s).unwrap()
}

fn window() -> DateRange {
    DateRange::new(day("2024-01-01"), day("2024-01-07")).unwrap()
}

fn desired(entries: &[(&str, u32)]) -> StaticSource {
    StaticSource::new(entries.iter().map(|(d, c)| (day(d), *c)).collect())
}

fn options(mode: SyncMode) -> SyncOptions {
    SyncOptions {
        range: window(),
        mode,
        assume_yes: true,
        push: false,
    }
}

fn bare_remote(root: &TempDir) -> String {
    let path = root.path().join("remote.git");
    let output = Command::new("git")
        .args(["init", "--quiet", "--bare"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let output = Command::new("git")
        .arg("--git-dir")
        .arg(&path)
        .args(["symbolic-ref", "HEAD", "refs/heads/main"])
        .output()
        .unwrap();
    assert!(output.status.success());
    path.to_string_lossy().into_owned()
}

fn remote_commit_count(remote: &str, branch: &str) -> usize {
    let output = Command::new("git")
        .args(["--git-dir", remote, "rev-list", "--count", branch])
        .output()
        .unwrap();
    if !output.status.success() {
        return 0;
    }
    String::from_utf8_lossy(&output.stdout).trim().parse().unwrap()
}

fn actual(repo: &GitRepo) -> ContributionMap {
    scan(repo, &identity(), &window()).unwrap()
}

fn sync(source: &dyn ActivitySource, repo: &GitRepo, mode: SyncMode) -> pipeline::SyncReport {
    pipeline::run(source, &account(), repo, &identity(), &options(mode), |_| true).unwrap()
}

fn fresh_repo(dir: &TempDir) -> GitRepo {
    GitRepo::init(&dir.path().join("mirror"), "main").unwrap()
}

// ---------------------------------------------------------------------------
// 1. Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_empty_mirror_receives_full_count() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    let source = desired(&[("2024-01-01", 3)]);

    let report = sync(&source, &repo, SyncMode::Apply);
    assert_eq!(report.plan.total_commits(), 3);
    assert_eq!(report.outcome, SyncOutcome::Applied { created: 3, pushed: false });
    assert_eq!(actual(&repo).get(day("2024-01-01")), 3);
}

#[test]
fn scenario_b_matching_counts_are_a_noop() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    let source = desired(&[("2024-01-01", 2)]);
    sync(&source, &repo, SyncMode::Apply);

    let report = sync(&source, &repo, SyncMode::Apply);
    assert!(report.plan.is_empty());
    assert_eq!(report.outcome, SyncOutcome::UpToDate);
    assert_eq!(repo.log_records().unwrap().len(), 2);
}

#[test]
fn scenario_c_only_missing_day_is_written() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    sync(&desired(&[("2024-01-01", 1)]), &repo, SyncMode::Apply);

    let source = desired(&[("2024-01-01", 1), ("2024-01-02", 4)]);
    let report = sync(&source, &repo, SyncMode::Apply);
    let planned: Vec<(Day, u32)> = report.plan.iter().map(|e| (e.day, e.count)).collect();
    assert_eq!(planned, vec![(day("2024-01-02"), 4)]);

    let newest: Vec<Day> = repo
        .log_records()
        .unwrap()
        .into_iter()
        .take(4)
        .map(|r| r.authored_at.date_naive())
        .collect();
    assert_eq!(newest, vec![day("2024-01-02"); 4]);
}

#[test]
fn scenario_d_over_count_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    sync(&desired(&[("2024-01-01", 7)]), &repo, SyncMode::Apply);

    let report = sync(&desired(&[("2024-01-01", 5)]), &repo, SyncMode::Apply);
    assert!(report.plan.is_empty());
    assert_eq!(actual(&repo).get(day("2024-01-01")), 7);
}

// ---------------------------------------------------------------------------
// 2. Properties
// ---------------------------------------------------------------------------

#[test]
fn second_run_plans_nothing() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    let source = desired(&[("2024-01-01", 2), ("2024-01-03", 1), ("2024-01-07", 5)]);

    sync(&source, &repo, SyncMode::Apply);
    let second = sync(&source, &repo, SyncMode::Apply);
    assert!(second.plan.is_empty());
    for d in window().days() {
        assert_eq!(second.actual.get(d), second.desired.get(d), "day {d}");
    }
}

#[test]
fn preview_plan_matches_applied_plan_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    let source = desired(&[("2024-01-02", 2), ("2024-01-05", 3)]);

    let preview = sync(&source, &repo, SyncMode::Preview);
    assert_eq!(preview.outcome, SyncOutcome::Previewed);
    assert!(!repo.has_commits().unwrap(), "preview must not write");

    let applied = sync(&source, &repo, SyncMode::Apply);
    assert_eq!(preview.plan, applied.plan);
    assert_eq!(
        applied.outcome,
        SyncOutcome::Applied {
            created: preview.plan.total_commits() as usize,
            pushed: false,
        }
    );
}

#[test]
fn manual_commits_by_other_authors_do_not_count() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    std::fs::write(repo.path().join("README.md"), "scaffold").unwrap();
    repo.commit_all(
        "scaffold",
        &Identity::new("owner", "owner@example.com"),
        chrono::DateTime::parse_from_rfc3339("2024-01-01T08:00:00Z")
            .unwrap()
            .into(),
    )
    .unwrap();

    let report = sync(&desired(&[("2024-01-01", 1)]), &repo, SyncMode::Apply);
    assert_eq!(report.plan.total_commits(), 1);
}

#[test]
fn partial_history_is_completed_not_duplicated() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    // An interrupted run that only got through part of the day.
    sync(&desired(&[("2024-01-04", 2)]), &repo, SyncMode::Apply);

    let report = sync(&desired(&[("2024-01-04", 6)]), &repo, SyncMode::Apply);
    assert_eq!(report.plan.total_commits(), 4);
    assert_eq!(actual(&repo).get(day("2024-01-04")), 6);
}

// ---------------------------------------------------------------------------
// 3. Confirmation and push
// ---------------------------------------------------------------------------

#[test]
fn declined_confirmation_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    let asked = Cell::new(false);
    let opts = SyncOptions {
        assume_yes: false,
        ..options(SyncMode::Apply)
    };

    let report = pipeline::run(
        &desired(&[("2024-01-01", 3)]),
        &account(),
        &repo,
        &identity(),
        &opts,
        |plan| {
            asked.set(true);
            assert_eq!(plan.total_commits(), 3);
            false
        },
    )
    .unwrap();

    assert!(asked.get());
    assert_eq!(report.outcome, SyncOutcome::Declined);
    assert!(!repo.has_commits().unwrap());
}

#[test]
fn assume_yes_skips_confirmation() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    let report = pipeline::run(
        &desired(&[("2024-01-01", 1)]),
        &account(),
        &repo,
        &identity(),
        &options(SyncMode::Apply),
        |_| panic!("confirmation must not be requested"),
    )
    .unwrap();
    assert_eq!(report.outcome, SyncOutcome::Applied { created: 1, pushed: false });
}

#[test]
fn apply_pushes_to_origin_and_next_clone_sees_history() {
    let root = TempDir::new().unwrap();
    let remote = bare_remote(&root);
    let source = desired(&[("2024-01-01", 2), ("2024-01-03", 1)]);
    let opts = SyncOptions {
        push: true,
        ..options(SyncMode::Apply)
    };

    {
        let workdir = Workdir::temp().unwrap();
        let repo = workdir::prepare(&workdir, &remote, "main", &identity()).unwrap();
        let report = pipeline::run(&source, &account(), &repo, &identity(), &opts, |_| true).unwrap();
        assert_eq!(report.outcome, SyncOutcome::Applied { created: 3, pushed: true });
    }
    assert_eq!(remote_commit_count(&remote, "main"), 3);

    // A fresh clone re-derives actual counts from the pushed history.
    let workdir = Workdir::temp().unwrap();
    let repo = workdir::prepare(&workdir, &remote, "main", &identity()).unwrap();
    let report = pipeline::run(&source, &account(), &repo, &identity(), &opts, |_| true).unwrap();
    assert_eq!(report.outcome, SyncOutcome::UpToDate);
    assert_eq!(remote_commit_count(&remote, "main"), 3);
}

#[test]
fn existing_local_clone_is_pulled_before_scanning() {
    let root = TempDir::new().unwrap();
    let remote = bare_remote(&root);
    let local = root.path().join("local");
    let push_opts = SyncOptions {
        push: true,
        ..options(SyncMode::Apply)
    };

    // First run through the long-lived local clone.
    let workdir = Workdir::local(&local).unwrap();
    let repo = workdir::prepare(&workdir, &remote, "main", &identity()).unwrap();
    pipeline::run(&desired(&[("2024-01-01", 1)]), &account(), &repo, &identity(), &push_opts, |_| true)
        .unwrap();

    // Another machine pushes more history.
    let other = Workdir::temp().unwrap();
    let other_repo = workdir::prepare(&other, &remote, "main", &identity()).unwrap();
    pipeline::run(&desired(&[("2024-01-02", 2)]), &account(), &other_repo, &identity(), &push_opts, |_| true)
        .unwrap();

    let repo = workdir::prepare(&workdir, &remote, "main", &identity()).unwrap();
    let report = pipeline::run(
        &desired(&[("2024-01-01", 1), ("2024-01-02", 2)]),
        &account(),
        &repo,
        &identity(),
        &push_opts,
        |_| true,
    )
    .unwrap();
    assert_eq!(report.outcome, SyncOutcome::UpToDate);
    assert!(Path::new(&local).join(".git").exists());
}

// ---------------------------------------------------------------------------
// 4. Errors
// ---------------------------------------------------------------------------

struct FailingSource;

impl ActivitySource for FailingSource {
    fn desired(&self, _: &AccountName, _: &DateRange) -> Result<ContributionMap, SourceError> {
        Err(SourceError::Unauthorized("bad token".to_string()))
    }
}

#[test]
fn data_source_failure_is_fatal_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    let err = pipeline::run(&FailingSource, &account(), &repo, &identity(), &options(SyncMode::Apply), |_| true)
        .unwrap_err();
    assert!(matches!(err, SyncError::DataSource(SourceError::Unauthorized(_))), "got: {err}");
    assert!(!repo.has_commits().unwrap());
}

#[test]
fn push_failure_keeps_local_commits_for_the_next_run() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    repo.add_remote("origin", &dir.path().join("missing.git").to_string_lossy())
        .unwrap();
    let opts = SyncOptions {
        push: true,
        ..options(SyncMode::Apply)
    };

    let err = pipeline::run(&desired(&[("2024-01-01", 2)]), &account(), &repo, &identity(), &opts, |_| true)
        .unwrap_err();
    assert!(matches!(err, SyncError::RepositoryAccess(_)), "got: {err}");

    // Commits exist locally; the retry plans nothing new.
    let retry = sync(&desired(&[("2024-01-01", 2)]), &repo, SyncMode::Preview);
    assert!(retry.plan.is_empty());
}

#[test]
fn commits_stranded_by_a_failed_push_reach_the_remote_on_the_next_run() {
    let root = TempDir::new().unwrap();
    let remote = bare_remote(&root);
    let parked = root.path().join("parked.git");
    let workdir = Workdir::local(root.path().join("local")).unwrap();
    let source = desired(&[("2024-01-01", 2)]);
    let opts = SyncOptions {
        push: true,
        ..options(SyncMode::Apply)
    };

    let repo = workdir::prepare(&workdir, &remote, "main", &identity()).unwrap();
    std::fs::rename(&remote, &parked).unwrap();
    let err = pipeline::run(&source, &account(), &repo, &identity(), &opts, |_| true).unwrap_err();
    assert!(matches!(err, SyncError::RepositoryAccess(_)), "got: {err}");
    std::fs::rename(&parked, &remote).unwrap();

    let repo = workdir::prepare(&workdir, &remote, "main", &identity()).unwrap();
    let report = pipeline::run(&source, &account(), &repo, &identity(), &opts, |_| true).unwrap();
    assert!(report.plan.is_empty());
    assert_eq!(report.outcome, SyncOutcome::PushedBacklog { commits: 2 });
    assert_eq!(remote_commit_count(&remote, "main"), 2);

    let report = pipeline::run(&source, &account(), &repo, &identity(), &opts, |_| true).unwrap();
    assert_eq!(report.outcome, SyncOutcome::UpToDate);
}

#[test]
fn unpushed_commits_stay_local_when_push_is_disabled() {
    let root = TempDir::new().unwrap();
    let remote = bare_remote(&root);
    let workdir = Workdir::temp().unwrap();
    let repo = workdir::prepare(&workdir, &remote, "main", &identity()).unwrap();
    let source = desired(&[("2024-01-03", 1)]);

    sync(&source, &repo, SyncMode::Apply);
    let report = sync(&source, &repo, SyncMode::Apply);
    assert_eq!(report.outcome, SyncOutcome::UpToDate);
    assert_eq!(repo.unpushed_commits("origin", "main").unwrap(), Some(1));
    assert_eq!(remote_commit_count(&remote, "main"), 0);
}

// ---------------------------------------------------------------------------
// 5. Pre-apply hook
// ---------------------------------------------------------------------------

fn counting(calls: &Cell<u32>) -> impl FnOnce(&GitRepo) -> Result<(), SyncError> + '_ {
    move |_: &GitRepo| {
        calls.set(calls.get() + 1);
        Ok(())
    }
}

#[test]
fn pre_apply_hook_waits_for_data_and_confirmation() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);
    let calls = Cell::new(0);
    let source = desired(&[("2024-01-02", 2)]);
    let asking = SyncOptions {
        assume_yes: false,
        ..options(SyncMode::Apply)
    };

    let err = pipeline::run_with(
        &FailingSource,
        &account(),
        &repo,
        &identity(),
        &options(SyncMode::Apply),
        |_| true,
        counting(&calls),
    )
    .unwrap_err();
    assert!(matches!(err, SyncError::DataSource(_)), "got: {err}");
    assert_eq!(calls.get(), 0, "source failure must not provision");

    let report = pipeline::run_with(
        &source,
        &account(),
        &repo,
        &identity(),
        &options(SyncMode::Preview),
        |_| true,
        counting(&calls),
    )
    .unwrap();
    assert_eq!(report.outcome, SyncOutcome::Previewed);
    assert_eq!(calls.get(), 0, "preview must not provision");

    let report =
        pipeline::run_with(&source, &account(), &repo, &identity(), &asking, |_| false, counting(&calls))
            .unwrap();
    assert_eq!(report.outcome, SyncOutcome::Declined);
    assert_eq!(calls.get(), 0, "declined plan must not provision");

    let report =
        pipeline::run_with(&source, &account(), &repo, &identity(), &asking, |_| true, counting(&calls))
            .unwrap();
    assert_eq!(report.outcome, SyncOutcome::Applied { created: 2, pushed: false });
    assert_eq!(calls.get(), 1);

    let report =
        pipeline::run_with(&source, &account(), &repo, &identity(), &asking, |_| true, counting(&calls))
            .unwrap();
    assert_eq!(report.outcome, SyncOutcome::UpToDate);
    assert_eq!(calls.get(), 1, "nothing to write, nothing to provision");
}

#[test]
fn pre_apply_hook_failure_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let repo = fresh_repo(&dir);

    let err = pipeline::run_with(
        &desired(&[("2024-01-02", 2)]),
        &account(),
        &repo,
        &identity(),
        &options(SyncMode::Apply),
        |_| true,
        |_| Err(SyncError::Provision("name already taken".into())),
    )
    .unwrap_err();
    assert!(matches!(err, SyncError::Provision(_)), "got: {err}");
    assert!(!repo.has_commits().unwrap());
}
