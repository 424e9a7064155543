//! Git collaborator: subprocess execution and the queries the workflows need
//!
//! Everything goes through [`GitRunner`] so tests can substitute a scripted
//! runner; [`SystemGit`] shells out to the `git` binary in a working
//! directory. The three call modes on [`Git`] mirror how callers treat the
//! exit status: [`Git::try_run`] branches on it, [`Git::run_checked`] treats
//! non-zero as fatal, and [`Git::line`] additionally requires exactly one
//! line of output.

use crate::error::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;
use tokio::process::Command;
use tracing::debug;

static COMMIT_HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9a-f]{40}$").expect("valid regex"));

/// Longest subject line accepted for a review message
pub const MAX_SUBJECT_LEN: usize = 100;

/// Captured result of one subprocess invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit status (`-1` when terminated by signal)
    pub status: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the process exited with status zero
    pub const fn success(&self) -> bool {
        self.status == 0
    }
}

/// Executes git with the given arguments and captures the outcome
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run `git <args>`; only spawn/IO failures are errors here
    async fn run(&self, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs the real `git` binary in a fixed working directory
pub struct SystemGit {
    workdir: PathBuf,
}

impl SystemGit {
    /// Create a runner rooted at `workdir`
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        debug!(?args, "running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .await?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Checks that a value is a 40-character hexadecimal commit hash
pub fn validate_hash(value: &str) -> Result<()> {
    if COMMIT_HASH_RE.is_match(value) {
        Ok(())
    } else {
        Err(Error::InvalidHash(value.to_string()))
    }
}

/// Parse `git ls-remote --heads` output into a branch -> hash map
///
/// Every row must be two tab-delimited fields, the first a commit hash and
/// the second a `refs/heads/` reference; anything else is fatal because it
/// means we cannot safely reason about the remote.
pub fn parse_ls_remote(output: &str) -> Result<BTreeMap<String, String>> {
    let mut branches = BTreeMap::new();
    for line in output.lines() {
        let Some((commit_hash, head_ref)) = line.split_once('\t') else {
            return Err(Error::LsRemote(format!(
                "{line:?}\n\nExpected two tab-delimited fields."
            )));
        };
        if validate_hash(commit_hash).is_err() {
            return Err(Error::LsRemote(format!(
                "{commit_hash:?} is not a valid commit hash."
            )));
        }
        let Some(branch) = head_ref.strip_prefix("refs/heads/") else {
            return Err(Error::LsRemote(format!(
                "head reference {head_ref:?} does not begin with refs/heads/."
            )));
        };
        branches.insert(branch.to_string(), commit_hash.to_string());
    }
    Ok(branches)
}

/// Split a full commit message into subject and description
///
/// The subject is whatever precedes the first description line. The full
/// message must begin with the subject git reported, otherwise the commit
/// was written without a blank line after the subject and we refuse to
/// guess where it ends.
pub fn split_message(subject: &str, message: &str) -> Result<(String, String)> {
    if subject.len() > MAX_SUBJECT_LEN {
        return Err(Error::SubjectTooLong(subject.to_string()));
    }
    let Some(rest) = message.strip_prefix(subject) else {
        return Err(Error::MismatchedSubject {
            message: message.to_string(),
            subject: subject.to_string(),
        });
    };
    Ok((subject.to_string(), rest.trim_start().to_string()))
}

/// High-level git interface used by the workflows
pub struct Git {
    runner: Box<dyn GitRunner>,
}

impl Git {
    /// Open a repository by shelling out to the system git in `workdir`
    pub fn open(workdir: impl Into<PathBuf>) -> Self {
        Self {
            runner: Box::new(SystemGit::new(workdir)),
        }
    }

    /// Build from an arbitrary runner (tests)
    pub fn with_runner(runner: Box<dyn GitRunner>) -> Self {
        Self { runner }
    }

    /// Run git and return the raw outcome; callers branch on the status
    pub async fn try_run(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner.run(args).await
    }

    /// Run git, treating a non-zero exit as fatal; returns stdout
    /// with the trailing newline removed
    pub async fn run_checked(&self, args: &[&str]) -> Result<String> {
        let out = self.runner.run(args).await?;
        if !out.success() {
            return Err(Error::Command {
                command: format!("git {}", args.join(" ")),
                stderr: out.stderr,
            });
        }
        Ok(out.stdout.trim_end_matches('\n').to_string())
    }

    /// Like [`Self::run_checked`] but the output must be exactly one line
    pub async fn line(&self, args: &[&str]) -> Result<String> {
        let out = self.runner.run(args).await?;
        if !out.success() {
            return Err(Error::Command {
                command: format!("git {}", args.join(" ")),
                stderr: out.stderr,
            });
        }
        if !out.stdout.ends_with('\n') || out.stdout.matches('\n').count() != 1 {
            return Err(Error::MalformedOutput(out.stdout));
        }
        Ok(out.stdout.trim_end_matches('\n').to_string())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Name of the currently checked-out branch
    pub async fn current_branch(&self) -> Result<String> {
        self.line(&["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    /// Absolute path of the repository root
    pub async fn repo_root(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(
            self.line(&["rev-parse", "--show-toplevel"]).await?,
        ))
    }

    /// Commit hash of HEAD in the given ref (validated 40-hex)
    pub async fn head_commit(&self, refname: &str) -> Result<String> {
        let hash = self.line(&["rev-parse", refname]).await?;
        validate_hash(&hash)?;
        Ok(hash)
    }

    /// One-line subject of a commit
    pub async fn commit_subject(&self, commit_hash: &str) -> Result<String> {
        self.line(&["log", "-s", "-1", "--pretty=%s", commit_hash])
            .await
    }

    /// Full commit message of a commit
    pub async fn commit_message(&self, commit_hash: &str) -> Result<String> {
        self.run_checked(&["log", "-s", "-1", "--pretty=format:%B", commit_hash])
            .await
    }

    /// Subject and remaining description of a commit, split and checked
    pub async fn commit_message_parts(&self, commit_hash: &str) -> Result<(String, String)> {
        let subject = self.commit_subject(commit_hash).await?;
        let message = self.commit_message(commit_hash).await?;
        split_message(&subject, &message)
    }

    /// Hashes of commits in `base..head`, newest first
    pub async fn commits_between(&self, base: &str, head: &str) -> Result<Vec<String>> {
        let range = format!("{base}..{head}");
        let output = self.run_checked(&["rev-list", &range]).await?;
        let commits: Vec<String> = output.lines().map(ToString::to_string).collect();
        for commit_hash in &commits {
            validate_hash(commit_hash)?;
        }
        Ok(commits)
    }

    /// Whether a local branch ref exists
    pub async fn branch_exists(&self, branch: &str) -> Result<bool> {
        let branch_ref = format!("refs/heads/{branch}");
        let out = self
            .try_run(&["show-ref", "--verify", "--quiet", &branch_ref])
            .await?;
        Ok(out.success())
    }

    /// Names of all configured remotes
    pub async fn remotes(&self) -> Result<Vec<String>> {
        let output = self.run_checked(&["remote"]).await?;
        Ok(output
            .lines()
            .filter(|l| !l.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    /// Configured URL of a remote
    pub async fn remote_url(&self, remote: &str) -> Result<String> {
        let key = format!("remote.{remote}.url");
        self.line(&["config", &key]).await
    }

    /// Branches advertised by a remote, mapped to their tip hashes
    pub async fn remote_branches(&self, remote: &str) -> Result<BTreeMap<String, String>> {
        let output = self.run_checked(&["ls-remote", "--heads", remote]).await?;
        parse_ls_remote(&output)
    }

    /// Local branches whose history contains the given commit
    pub async fn branches_containing(&self, commit_hash: &str) -> Result<Vec<String>> {
        let output = self
            .run_checked(&["branch", "--contains", commit_hash])
            .await?;
        Ok(output
            .lines()
            .map(|line| line[2.min(line.len())..].to_string())
            .collect())
    }

    /// Whether the working tree has no unstaged changes
    pub async fn is_clean(&self) -> Result<bool> {
        let out = self
            .try_run(&["diff", "--exit-code", "--quiet"])
            .await?;
        Ok(out.success())
    }

    /// The working-tree diff, for showing alongside a dirty-tree refusal
    pub async fn diff(&self) -> Result<String> {
        self.run_checked(&["diff"]).await
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Fetch a remote, returning git's progress output
    pub async fn fetch(&self, remote: &str) -> Result<String> {
        self.run_checked(&["fetch", remote]).await
    }

    /// Attempt `git merge --squash`; the caller branches on the status
    pub async fn merge_squash(&self, committish: &str) -> Result<CommandOutput> {
        self.try_run(&["merge", "--squash", committish]).await
    }

    /// Commit staged changes with the given message
    pub async fn commit(&self, message: &str) -> Result<String> {
        self.run_checked(&["commit", "-m", message]).await
    }

    /// Push a refspec to a remote; the caller branches on the status
    pub async fn push(&self, remote: &str, refspec: &str) -> Result<CommandOutput> {
        self.try_run(&["push", remote, refspec]).await
    }

    /// Check out a branch
    pub async fn checkout(&self, target: &str) -> Result<()> {
        self.run_checked(&["checkout", target]).await?;
        Ok(())
    }

    /// Forced checkout, discarding local modifications blocking the switch
    pub async fn checkout_force(&self, target: &str) -> Result<()> {
        self.run_checked(&["checkout", "-f", target]).await?;
        Ok(())
    }

    /// Detach HEAD at the given committish; the caller branches on the status
    pub async fn checkout_detach(&self, target: &str) -> Result<CommandOutput> {
        self.try_run(&["checkout", "--detach", target]).await
    }

    /// Create and check out a new branch at HEAD, keeping the index
    pub async fn checkout_new_branch(&self, branch: &str) -> Result<CommandOutput> {
        self.try_run(&["checkout", "-b", branch]).await
    }

    /// Move HEAD without touching index or working tree
    pub async fn reset_soft(&self, target: &str) -> Result<CommandOutput> {
        self.try_run(&["reset", "--soft", target]).await
    }

    /// Reset HEAD, index and working tree to the target
    pub async fn reset_hard(&self, target: &str) -> Result<()> {
        self.run_checked(&["reset", "--hard", target]).await?;
        Ok(())
    }

    /// Delete a local branch regardless of merge state
    pub async fn delete_branch(&self, branch: &str) -> Result<()> {
        self.run_checked(&["branch", "-D", branch]).await?;
        Ok(())
    }

    /// Rename a local branch
    pub async fn rename_branch(&self, source: &str, target: &str) -> Result<()> {
        self.run_checked(&["branch", "-m", source, target]).await?;
        Ok(())
    }

    /// Create a branch tracking the given upstream ref
    pub async fn create_tracking_branch(&self, branch: &str, upstream: &str) -> Result<()> {
        self.run_checked(&["branch", "--track", branch, upstream])
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Repository-local configuration (metadata store backend)
    // ------------------------------------------------------------------

    /// Read one config value, `None` when the key is unset
    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        let out = self.try_run(&["config", key]).await?;
        if out.success() {
            Ok(Some(out.stdout.trim_end_matches('\n').to_string()))
        } else {
            Ok(None)
        }
    }

    /// Write one config value
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        let output = self.run_checked(&["config", key, value]).await?;
        if output.is_empty() {
            Ok(())
        } else {
            Err(Error::Internal(format!(
                "unexpected output {output:?} from \"git config\""
            )))
        }
    }

    /// Remove one config key
    pub async fn config_unset(&self, key: &str) -> Result<()> {
        self.run_checked(&["config", "--unset", key]).await?;
        Ok(())
    }

    /// Whether any config key matches the regex
    pub async fn config_has_matching(&self, regex: &str) -> Result<bool> {
        let out = self.try_run(&["config", "--get-regexp", regex]).await?;
        Ok(out.success())
    }

    /// Drop an entire config section
    pub async fn config_remove_section(&self, section: &str) -> Result<()> {
        self.run_checked(&["config", "--remove-section", section])
            .await?;
        Ok(())
    }
}
