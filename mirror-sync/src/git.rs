//! Thin wrapper around the `git` executable.
//!
//! Every invocation runs with `GIT_TERMINAL_PROMPT=0` so a missing credential
//! fails fast instead of blocking on a prompt. Arguments and stderr are passed
//! through [`redact`] before they reach an error or a log line, because remote
//! URLs may embed an access token.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::{DateTime, Utc};

use mirror_core::Identity;

use crate::error::GitError;

/// Field separator for `git log --format`; never appears in emails or hashes.
const FIELD_SEP: char = '\u{1f}';

/// One commit reachable from `HEAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub hash: String,
    pub author_email: String,
    pub authored_at: DateTime<Utc>,
}

/// Handle to a local work tree.
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    /// `git init` at `path` with `branch` as the unborn initial branch.
    pub fn init(path: &Path, branch: &str) -> Result<Self, GitError> {
        std::fs::create_dir_all(path).map_err(|e| GitError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let repo = Self {
            path: path.to_path_buf(),
        };
        let head_ref = format!("refs/heads/{branch}");
        repo.run(["init", "--quiet"])?;
        repo.run(["symbolic-ref", "HEAD", head_ref.as_str()])?;
        Ok(repo)
    }

    /// `git clone <url> <path>`. `path` must be absent or an empty directory.
    pub fn clone_from(url: &str, path: &Path) -> Result<Self, GitError> {
        let dest = path.to_string_lossy();
        run_in(None, ["clone", "--quiet", url, &*dest], &[])?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Open an existing work tree.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = Self {
            path: path.to_path_buf(),
        };
        repo.run(["rev-parse", "--is-inside-work-tree"])?;
        Ok(repo)
    }

    /// Whether `dir` is the root of a git work tree.
    pub fn is_work_tree(dir: &Path) -> bool {
        dir.join(".git").exists()
            && git_command(Some(dir), ["rev-parse", "--is-inside-work-tree"], &[])
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
    }

    /// Whether the remote at `url` advertises any branch.
    pub fn remote_has_heads(url: &str) -> Result<bool, GitError> {
        let stdout = run_in(None, ["ls-remote", "--heads", url], &[])?;
        Ok(!stdout.trim().is_empty())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False for a freshly initialised repository with an unborn branch.
    pub fn has_commits(&self) -> Result<bool, GitError> {
        let output = git_command(
            Some(&self.path),
            ["rev-parse", "--verify", "--quiet", "HEAD"],
            &[],
        )
        .output()
        .map_err(|e| GitError::Spawn {
            args: "rev-parse --verify --quiet HEAD".to_string(),
            source: e,
        })?;
        Ok(output.status.success())
    }

    /// Name of the checked-out branch, also valid before the first commit.
    pub fn current_branch(&self) -> Result<String, GitError> {
        let branch = self.run(["symbolic-ref", "--short", "HEAD"])?;
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(GitError::Parse("empty branch name".to_string()));
        }
        Ok(branch.to_string())
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.run(["remote", "add", name, url])?;
        Ok(())
    }

    pub fn pull_rebase(&self, remote: &str, branch: &str, identity: &Identity) -> Result<(), GitError> {
        run_in(
            Some(&self.path),
            ["pull", "--quiet", "--rebase", remote, branch],
            &identity_env(identity, None),
        )?;
        Ok(())
    }

    /// Whether a remote called `name` is configured.
    pub fn has_remote(&self, name: &str) -> Result<bool, GitError> {
        Ok(self.run(["remote"])?.lines().any(|line| line.trim() == name))
    }

    /// Point `name` at `url`, adding the remote if it does not exist yet.
    pub fn set_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        if self.has_remote(name)? {
            self.run(["remote", "set-url", name, url])?;
            return Ok(());
        }
        self.add_remote(name, url)
    }

    /// Commits on `HEAD` that `remote`'s tracking ref for `branch` does not
    /// have. Every commit counts when there is no tracking ref yet. `None`
    /// when `remote` is not configured.
    pub fn unpushed_commits(&self, remote: &str, branch: &str) -> Result<Option<u32>, GitError> {
        if !self.has_remote(remote)? {
            return Ok(None);
        }
        if !self.has_commits()? {
            return Ok(Some(0));
        }
        let tracking = format!("refs/remotes/{remote}/{branch}");
        let tracked = git_command(
            Some(&self.path),
            ["rev-parse", "--verify", "--quiet", tracking.as_str()],
            &[],
        )
        .output()
        .map_err(|e| GitError::Spawn {
            args: format!("rev-parse --verify --quiet {tracking}"),
            source: e,
        })?
        .status
        .success();
        let span = if tracked {
            format!("{tracking}..HEAD")
        } else {
            "HEAD".to_string()
        };
        let count = self.run(["rev-list", "--count", span.as_str()])?;
        let count = count.trim();
        count
            .parse()
            .map(Some)
            .map_err(|_| GitError::Parse(format!("rev-list count '{count}'")))
    }

    /// Plain, non-forced push of `branch`.
    pub fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run(["push", "--quiet", remote, branch])?;
        Ok(())
    }

    /// Author email and author time of every commit reachable from `HEAD`,
    /// newest first. Empty for a repository without commits.
    pub fn log_records(&self) -> Result<Vec<LogRecord>, GitError> {
        if !self.has_commits()? {
            return Ok(Vec::new());
        }
        let stdout = self.run(["log", "--format=%H%x1f%ae%x1f%at", "HEAD"])?;
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_log_line)
            .collect()
    }

    /// Stage everything and commit with explicit identity and timestamps.
    ///
    /// Returns the new commit hash.
    pub fn commit_all(
        &self,
        message: &str,
        identity: &Identity,
        when: DateTime<Utc>,
    ) -> Result<String, GitError> {
        self.run(["add", "--all"])?;
        run_in(
            Some(&self.path),
            [
                "-c",
                "commit.gpgsign=false",
                "commit",
                "--quiet",
                "--no-verify",
                "-m",
                message,
            ],
            &identity_env(identity, Some(when)),
        )?;
        Ok(self.run(["rev-parse", "HEAD"])?.trim().to_string())
    }

    /// Tree hash of `rev`.
    pub fn tree_of(&self, rev: &str) -> Result<String, GitError> {
        let spec = format!("{rev}^{{tree}}");
        Ok(self.run(["rev-parse", spec.as_str()])?.trim().to_string())
    }

    fn run<I, S>(&self, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        run_in(Some(&self.path), args, &[])
    }
}

/// Replace credentials embedded in URLs (`https://token@host/...`) with `***`.
pub fn redact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("://") {
        let (head, tail) = rest.split_at(pos + 3);
        out.push_str(head);
        let authority_end = tail
            .find(|c: char| c == '/' || c.is_whitespace())
            .unwrap_or(tail.len());
        match tail[..authority_end].rfind('@') {
            Some(at) => {
                out.push_str("***");
                rest = &tail[at..];
            }
            None => rest = tail,
        }
    }
    out.push_str(rest);
    out
}

fn identity_env(identity: &Identity, when: Option<DateTime<Utc>>) -> Vec<(&'static str, String)> {
    let mut env = vec![
        ("GIT_AUTHOR_NAME", identity.name.clone()),
        ("GIT_AUTHOR_EMAIL", identity.email.clone()),
        ("GIT_COMMITTER_NAME", identity.name.clone()),
        ("GIT_COMMITTER_EMAIL", identity.email.clone()),
    ];
    if let Some(when) = when {
        let stamp = when.to_rfc3339();
        env.push(("GIT_AUTHOR_DATE", stamp.clone()));
        env.push(("GIT_COMMITTER_DATE", stamp));
    }
    env
}

fn parse_log_line(line: &str) -> Result<LogRecord, GitError> {
    let mut fields = line.split(FIELD_SEP);
    let (Some(hash), Some(email), Some(secs), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(GitError::Parse(format!("log line '{line}'")));
    };
    let secs: i64 = secs
        .trim()
        .parse()
        .map_err(|_| GitError::Parse(format!("author timestamp '{secs}'")))?;
    let authored_at = DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| GitError::Parse(format!("author timestamp '{secs}' out of range")))?;
    Ok(LogRecord {
        hash: hash.to_string(),
        author_email: email.to_string(),
        authored_at,
    })
}

fn git_command<I, S>(dir: Option<&Path>, args: I, env: &[(&str, String)]) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new("git");
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C");
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd
}

fn run_in<I, S>(dir: Option<&Path>, args: I, env: &[(&str, String)]) -> Result<String, GitError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let shown = redact(
        &args
            .iter()
            .map(|a| a.as_ref().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" "),
    );
    tracing::debug!(dir = ?dir, "git {}", shown);

    let output: Output = git_command(dir, &args, env)
        .output()
        .map_err(|e| GitError::Spawn {
            args: shown.clone(),
            source: e,
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::Failed {
            args: shown,
            stderr: redact(stderr.trim()),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
