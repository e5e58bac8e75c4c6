//! Configuration resolution: CLI flag > environment (incl. `.env`) > default.
//!
//! Resolution is pure given an environment lookup, so tests pass a map
//! instead of touching the process environment. Dates are validated here,
//! before anything touches the network or a repository.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};

use mirror_core::{parse_day, AccountName, Day, Identity};

use crate::commands::{scan::ScanArgs, sync::SyncArgs};

pub const DEFAULT_BRANCH: &str = "main";

/// Environment variable names.
pub mod keys {
    pub const TOKEN: &str = "PERSONAL_GITHUB_TOKEN";
    pub const WORK_USERNAME: &str = "WORK_GITHUB_USERNAME";
    pub const PERSONAL_USERNAME: &str = "PERSONAL_GITHUB_USERNAME";
    pub const TARGET_REPO: &str = "TARGET_REPO_NAME";
    pub const START_DATE: &str = "START_DATE";
    pub const END_DATE: &str = "END_DATE";
    pub const LOCAL_REPO_DIR: &str = "LOCAL_REPO_DIR";
    pub const AUTHOR_NAME: &str = "MIRROR_AUTHOR_NAME";
    pub const AUTHOR_EMAIL: &str = "MIRROR_AUTHOR_EMAIL";
    pub const BRANCH: &str = "MIRROR_BRANCH";
}

/// Load `path`, or `./.env` when `path` is `None`. Only an explicit file
/// that is missing is an error. Existing process variables win.
pub fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => dotenvy::from_path(path)
            .with_context(|| format!("failed to load env file '{}'", path.display())),
        None => match dotenvy::dotenv() {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "loaded .env");
                Ok(())
            }
            Err(err) if err.not_found() => Ok(()),
            Err(err) => Err(err).context("failed to load .env"),
        },
    }
}

/// Process environment lookup; blank values count as unset.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Today in UTC.
pub fn today() -> Day {
    Utc::now().date_naive()
}

/// Where the first day of the range comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartSpec {
    Explicit(Day),
    /// Creation date of the source account, looked up at run time.
    AccountCreation,
}

/// How the mirror remote is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSpec {
    /// Provisioned through the GitHub API as `<owner>/<name>`.
    Github { owner: String, name: String },
    /// Any git URL or path; no provisioning.
    Url(String),
}

/// Fully resolved settings for `mirror sync`.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub token: Option<String>,
    pub account: AccountName,
    pub start: StartSpec,
    pub end: Day,
    pub contributions_file: Option<PathBuf>,
    pub remote: RemoteSpec,
    pub local_dir: Option<PathBuf>,
    pub identity: Identity,
    pub branch: String,
    pub dry_run: bool,
    pub assume_yes: bool,
    pub keep_repo: bool,
    pub reset: bool,
    pub push: bool,
}

impl SyncConfig {
    pub fn resolve(args: &SyncArgs, today: Day, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let (start, end) = resolve_dates(args.start.as_deref(), args.end.as_deref(), today, &env)?;
        let start = match start {
            Some(day) => StartSpec::Explicit(day),
            None if args.backfill => StartSpec::AccountCreation,
            None => StartSpec::Explicit(yesterday(today)),
        };
        if let StartSpec::Explicit(day) = start {
            mirror_core::DateRange::new(day, end)?;
        }

        let personal = env(keys::PERSONAL_USERNAME);
        let remote = match &args.remote {
            Some(url) => RemoteSpec::Url(url.clone()),
            None => RemoteSpec::Github {
                owner: require(personal.clone(), keys::PERSONAL_USERNAME)?,
                name: require(env(keys::TARGET_REPO), keys::TARGET_REPO)?,
            },
        };

        let needs_api = args.contributions_file.is_none()
            || matches!(remote, RemoteSpec::Github { .. })
            || start == StartSpec::AccountCreation;
        let token = env(keys::TOKEN);
        if needs_api && token.is_none() {
            bail!("{} is required (set in env or .env file)", keys::TOKEN);
        }

        let account = match env(keys::WORK_USERNAME) {
            Some(login) => AccountName(login),
            None if args.contributions_file.is_some() && start != StartSpec::AccountCreation => {
                AccountName::from("local")
            }
            None => bail!("{} is required (set in env or .env file)", keys::WORK_USERNAME),
        };

        let local_dir = args
            .local_dir
            .clone()
            .or_else(|| env(keys::LOCAL_REPO_DIR).map(PathBuf::from));
        if args.reset && local_dir.is_some() {
            bail!("--reset rebuilds from an empty repository; unset {}", keys::LOCAL_REPO_DIR);
        }

        Ok(Self {
            token,
            account,
            start,
            end,
            contributions_file: args.contributions_file.clone(),
            remote,
            local_dir,
            identity: resolve_identity(personal.as_deref(), &env)?,
            branch: env(keys::BRANCH).unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            dry_run: args.dry_run,
            assume_yes: args.yes,
            keep_repo: args.keep_repo,
            reset: args.reset,
            push: !args.no_push,
        })
    }
}

/// Fully resolved settings for `mirror scan`.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub local_dir: PathBuf,
    pub start: Day,
    pub end: Day,
    pub identity: Identity,
}

impl ScanConfig {
    pub fn resolve(args: &ScanArgs, today: Day, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let (start, end) = resolve_dates(args.start.as_deref(), args.end.as_deref(), today, &env)?;
        let start = start.unwrap_or_else(|| yesterday(today));
        mirror_core::DateRange::new(start, end)?;
        let local_dir = match args.local_dir.clone() {
            Some(dir) => dir,
            None => PathBuf::from(require(env(keys::LOCAL_REPO_DIR), keys::LOCAL_REPO_DIR)?),
        };
        Ok(Self {
            local_dir,
            start,
            end,
            identity: resolve_identity(env(keys::PERSONAL_USERNAME).as_deref(), &env)?,
        })
    }
}

fn resolve_dates(
    start: Option<&str>,
    end: Option<&str>,
    today: Day,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<(Option<Day>, Day)> {
    let start = match start.map(str::to_owned).or_else(|| env(keys::START_DATE)) {
        Some(raw) => Some(parse_day(&raw)?),
        None => None,
    };
    let end = match end.map(str::to_owned).or_else(|| env(keys::END_DATE)) {
        Some(raw) => parse_day(&raw)?,
        None => today,
    };
    Ok((start, end))
}

/// Author identity for synthetic commits. Defaults derive from the personal
/// username: `<user>` / `<user>@users.noreply.github.com`.
fn resolve_identity(personal: Option<&str>, env: &impl Fn(&str) -> Option<String>) -> Result<Identity> {
    let email = match (env(keys::AUTHOR_EMAIL), personal) {
        (Some(email), _) => email,
        (None, Some(user)) => format!("{user}@users.noreply.github.com"),
        (None, None) => bail!(
            "set {} or {} to choose the mirror commit author",
            keys::AUTHOR_EMAIL,
            keys::PERSONAL_USERNAME
        ),
    };
    let name = env(keys::AUTHOR_NAME)
        .or_else(|| personal.map(str::to_owned))
        .unwrap_or_else(|| "mirror".to_string());
    Ok(Identity::new(name, email))
}

fn require(value: Option<String>, key: &str) -> Result<String> {
    value.with_context(|| format!("{key} is required (set in env or .env file)"))
}

fn yesterday(today: Day) -> Day {
    today - Duration::days(1)
}
