//! `mirror sync`: bring the mirror repository up to date.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use mirror_core::{DateRange, DeltaPlan};
use mirror_github::{
    authenticated_clone_url, fetch_created_at, repos, GithubActivitySource, GithubClient,
    GithubError, RemoteRepo,
};
use mirror_sync::{
    pipeline::{self, SyncMode, SyncOptions, SyncReport},
    workdir::{self, ORIGIN},
    ActivitySource, FileSource, GitRepo, SyncError, Workdir,
};

use crate::commands::report;
use crate::config::{self, RemoteSpec, StartSpec, SyncConfig};

/// Arguments for `mirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// First day to mirror, YYYY-MM-DD [env: START_DATE] (default: yesterday).
    #[arg(long)]
    pub start: Option<String>,

    /// Last day to mirror, YYYY-MM-DD [env: END_DATE] (default: today).
    #[arg(long)]
    pub end: Option<String>,

    /// Start from the work account's creation date unless --start is given.
    #[arg(long)]
    pub backfill: bool,

    /// Show the plan without creating commits or pushing.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Keep the temporary working directory and print its path.
    #[arg(long)]
    pub keep_repo: bool,

    /// Use this directory as the working clone [env: LOCAL_REPO_DIR].
    #[arg(long)]
    pub local_dir: Option<PathBuf>,

    /// Delete and recreate the mirror repository, then rebuild it.
    #[arg(long, conflicts_with_all = ["local_dir", "remote"])]
    pub reset: bool,

    /// Load variables from this file instead of ./.env.
    #[arg(long, value_name = "FILE")]
    pub env: Option<PathBuf>,

    /// Read desired counts from a JSON file ({"YYYY-MM-DD": n}) instead of GitHub.
    #[arg(long, value_name = "FILE")]
    pub contributions_file: Option<PathBuf>,

    /// Push to this git URL or path instead of provisioning a GitHub repository.
    #[arg(long, value_name = "URL")]
    pub remote: Option<String>,

    /// Create commits locally but do not push them.
    #[arg(long)]
    pub no_push: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        config::load_env_file(self.env.as_deref())?;
        let cfg = SyncConfig::resolve(&self, config::today(), config::process_env)?;
        let client = cfg.token.as_deref().map(GithubClient::new);

        let start = match cfg.start {
            StartSpec::Explicit(day) => day,
            StartSpec::AccountCreation => {
                let day = fetch_created_at(require_client(&client)?, &cfg.account)
                    .with_context(|| format!("failed to look up account '{}'", cfg.account))?;
                println!("Backfilling from account creation date: {day}");
                day
            }
        };
        let range = DateRange::new(start, cfg.end)?;

        let source: Box<dyn ActivitySource> = match &cfg.contributions_file {
            Some(path) => Box::new(FileSource::new(path)),
            None => Box::new(GithubActivitySource::new(require_client(&client)?.clone())),
        };

        let mode = if cfg.dry_run {
            SyncMode::Preview
        } else {
            SyncMode::Apply
        };
        let host = client.as_ref().map(|c| c as &dyn MirrorHost);
        let target = resolve_target(&cfg, host, mode)?;

        let workdir = choose_workdir(&cfg, mode)?;
        let result = sync_in(
            &cfg,
            host,
            source.as_ref(),
            range,
            mode,
            &target,
            &workdir,
            report::confirm,
        );

        if cfg.keep_repo && workdir.is_temporary() {
            let path = workdir.keep();
            println!("Local repo kept at: {}", path.display());
        }

        let report = result?;
        let profile_url = match &cfg.remote {
            RemoteSpec::Github { owner, .. } => Some(format!("https://github.com/{owner}")),
            RemoteSpec::Url(_) => None,
        };
        report::print_sync(&report, profile_url.as_deref());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mirror host
// ---------------------------------------------------------------------------

/// GitHub calls made on behalf of the mirror repository.
pub(crate) trait MirrorHost {
    fn lookup(&self, owner: &str, name: &str) -> Result<Option<RemoteRepo>, GithubError>;
    fn create(&self, name: &str) -> Result<(), GithubError>;
    fn delete(&self, owner: &str, name: &str) -> Result<(), GithubError>;
    fn clone_url(&self, owner: &str, name: &str) -> String;
}

impl MirrorHost for GithubClient {
    fn lookup(&self, owner: &str, name: &str) -> Result<Option<RemoteRepo>, GithubError> {
        repos::lookup_repo(self, owner, name)
    }

    fn create(&self, name: &str) -> Result<(), GithubError> {
        repos::create_repo(self, name).map(|_| ())
    }

    fn delete(&self, owner: &str, name: &str) -> Result<(), GithubError> {
        repos::delete_repo(self, owner, name)
    }

    fn clone_url(&self, owner: &str, name: &str) -> String {
        authenticated_clone_url(owner, name, self.token())
    }
}

/// Change to the GitHub repository, carried out only once the plan is
/// confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Provision {
    Create { owner: String, name: String, url: String },
    Recreate { owner: String, name: String, url: String },
}

impl Provision {
    fn carry_out(&self, host: &dyn MirrorHost, repo: &GitRepo) -> Result<(), SyncError> {
        let wrap = |e: GithubError| SyncError::Provision(Box::new(e));
        let (owner, name, url) = match self {
            Provision::Create { owner, name, url } => (owner, name, url),
            Provision::Recreate { owner, name, url } => {
                host.delete(owner, name).map_err(wrap)?;
                (owner, name, url)
            }
        };
        host.create(name).map_err(wrap)?;
        repo.set_remote(ORIGIN, url)?;
        match self {
            Provision::Create { .. } => println!("Created private repo {owner}/{name}."),
            Provision::Recreate { .. } => println!("Recreated private repo {owner}/{name}."),
        }
        Ok(())
    }
}

/// Where the run reads existing history from, and what must be provisioned
/// before the first commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Target {
    /// Clone URL of a mirror that exists now. `None` plans against an
    /// empty repository.
    existing: Option<String>,
    provision: Option<Provision>,
}

/// Decide the target without changing anything on GitHub.
fn resolve_target(
    cfg: &SyncConfig,
    host: Option<&dyn MirrorHost>,
    mode: SyncMode,
) -> Result<Target> {
    let (owner, name) = match &cfg.remote {
        RemoteSpec::Url(url) => {
            return Ok(Target {
                existing: Some(url.clone()),
                provision: None,
            })
        }
        RemoteSpec::Github { owner, name } => (owner.clone(), name.clone()),
    };
    let host = host.context("PERSONAL_GITHUB_TOKEN is required to reach GitHub")?;
    let url = host.clone_url(&owner, &name);

    if cfg.reset {
        if mode == SyncMode::Preview {
            println!("{} Would delete and recreate {owner}/{name}.", "[dry-run]".cyan());
            return Ok(Target::default());
        }
        return Ok(Target {
            existing: None,
            provision: Some(Provision::Recreate { owner, name, url }),
        });
    }

    let found = host
        .lookup(&owner, &name)
        .with_context(|| format!("failed to look up {owner}/{name}"))?;
    match found {
        Some(repo) => {
            if !repo.private {
                tracing::warn!(repo = %repo.full_name, "mirror repository is public");
            }
            Ok(Target {
                existing: Some(url),
                provision: None,
            })
        }
        None if mode == SyncMode::Preview => {
            println!("{} Would create private repo {owner}/{name}.", "[dry-run]".cyan());
            Ok(Target::default())
        }
        None => Ok(Target {
            existing: None,
            provision: Some(Provision::Create { owner, name, url }),
        }),
    }
}

/// A preview never clones into or initialises a caller-owned `--local-dir`;
/// unless it already holds a clone, the plan is built in a throwaway directory.
fn choose_workdir(cfg: &SyncConfig, mode: SyncMode) -> Result<Workdir> {
    let workdir = match &cfg.local_dir {
        Some(path) if mode == SyncMode::Preview && !GitRepo::is_work_tree(path) => {
            Workdir::temp()?
        }
        Some(path) => Workdir::local(path)?,
        None => Workdir::temp()?,
    };
    Ok(workdir)
}

#[allow(clippy::too_many_arguments)]
fn sync_in<C>(
    cfg: &SyncConfig,
    host: Option<&dyn MirrorHost>,
    source: &dyn ActivitySource,
    range: DateRange,
    mode: SyncMode,
    target: &Target,
    workdir: &Workdir,
    confirm: C,
) -> Result<SyncReport>
where
    C: FnOnce(&DeltaPlan) -> bool,
{
    let repo = match &target.existing {
        Some(url) => workdir::prepare(workdir, url, &cfg.branch, &cfg.identity)
            .context("failed to prepare mirror repository")?,
        None if GitRepo::is_work_tree(workdir.path()) => GitRepo::open(workdir.path())?,
        None => workdir::prepare_empty(workdir, &cfg.branch)?,
    };

    let options = SyncOptions {
        range,
        mode,
        assume_yes: cfg.assume_yes,
        push: cfg.push,
    };
    let provision = |repo: &GitRepo| match (&target.provision, host) {
        (Some(provision), Some(host)) => provision.carry_out(host, repo),
        (Some(_), None) => Err(SyncError::Provision("no GitHub client".into())),
        (None, _) => Ok(()),
    };
    let report = pipeline::run_with(
        source,
        &cfg.account,
        &repo,
        &cfg.identity,
        &options,
        confirm,
        provision,
    )?;
    Ok(report)
}

fn require_client(client: &Option<GithubClient>) -> Result<&GithubClient> {
    client
        .as_ref()
        .context("PERSONAL_GITHUB_TOKEN is required to reach GitHub")
}
