//! Git adapter for the publisher.
//!
//! Every operation takes the [`RepoHandle`] it acts on and runs `git` with that
//! checkout as its working directory.

use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::io::process::{CommandOutput, ProcessLimits, run_checked};
use crate::io::workspace::RepoHandle;

/// Result of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Nothing was staged. A normal outcome, not an error.
    NothingToCommit,
}

/// Local version-control operations used to publish a patch.
pub trait Vcs {
    /// Point `name` at `url`, adding the remote or updating its URL.
    fn ensure_remote(&self, repo: &RepoHandle, name: &str, url: &str) -> Result<()>;
    /// Create and check out `branch` at HEAD.
    fn checkout_new_branch(&self, repo: &RepoHandle, branch: &str) -> Result<()>;
    /// Fetch `branch` from `remote` and check it out locally.
    fn checkout_remote_branch(&self, repo: &RepoHandle, remote: &str, branch: &str)
    -> Result<()>;
    /// Stage every working-tree change, including deletions.
    fn add_all(&self, repo: &RepoHandle) -> Result<()>;
    fn commit(&self, repo: &RepoHandle, message: &str) -> Result<CommitOutcome>;
    /// Push `branch` to `remote`, setting upstream.
    fn push(&self, repo: &RepoHandle, remote: &str, branch: &str) -> Result<()>;
}

/// [`Vcs`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    limits: ProcessLimits,
}

impl GitCli {
    pub fn new(limits: ProcessLimits) -> Self {
        Self { limits }
    }

    /// Names of the configured remotes.
    pub fn remotes(&self, repo: &RepoHandle) -> Result<Vec<String>> {
        let out = self.run_capture(repo, &["remote"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self, repo: &RepoHandle) -> Result<bool> {
        let out = self.run_capture(repo, &["diff", "--cached", "--name-only"])?;
        Ok(!out.trim().is_empty())
    }

    fn run_capture(&self, repo: &RepoHandle, args: &[&str]) -> Result<String> {
        let output = self.run_checked(repo, args)?;
        Ok(output.stdout_text())
    }

    fn run_checked(&self, repo: &RepoHandle, args: &[&str]) -> Result<CommandOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(repo.root());
        run_checked(cmd, self.limits).with_context(|| format!("git in {}", repo.repo()))
    }
}

impl Vcs for GitCli {
    #[instrument(skip_all, fields(repo = %repo.repo(), remote = %name))]
    fn ensure_remote(&self, repo: &RepoHandle, name: &str, url: &str) -> Result<()> {
        if self.remotes(repo)?.iter().any(|remote| remote == name) {
            debug!(url, "remote exists, updating url");
            self.run_checked(repo, &["remote", "set-url", name, url])?;
        } else {
            debug!(url, "adding remote");
            self.run_checked(repo, &["remote", "add", name, url])?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(repo = %repo.repo(), branch = %branch))]
    fn checkout_new_branch(&self, repo: &RepoHandle, branch: &str) -> Result<()> {
        debug!("creating and checking out new branch");
        self.run_checked(repo, &["checkout", "-b", branch])?;
        Ok(())
    }

    #[instrument(skip_all, fields(repo = %repo.repo(), remote = %remote, branch = %branch))]
    fn checkout_remote_branch(
        &self,
        repo: &RepoHandle,
        remote: &str,
        branch: &str,
    ) -> Result<()> {
        debug!("fetching existing branch");
        let refspec = format!("+refs/heads/{branch}:refs/remotes/{remote}/{branch}");
        self.run_checked(repo, &["fetch", remote, &refspec])?;
        let tracking = format!("{remote}/{branch}");
        self.run_checked(repo, &["checkout", "-B", branch, &tracking])?;
        Ok(())
    }

    fn add_all(&self, repo: &RepoHandle) -> Result<()> {
        self.run_checked(repo, &["add", "-A"])?;
        Ok(())
    }

    /// If there are no staged changes, this returns `NothingToCommit` and does nothing.
    #[instrument(skip_all, fields(repo = %repo.repo()))]
    fn commit(&self, repo: &RepoHandle, message: &str) -> Result<CommitOutcome> {
        if !self.has_staged_changes(repo)? {
            debug!("no staged changes, skipping commit");
            return Ok(CommitOutcome::NothingToCommit);
        }
        debug!("committing staged changes");
        self.run_checked(repo, &["commit", "-m", message])?;
        Ok(CommitOutcome::Committed)
    }

    #[instrument(skip_all, fields(repo = %repo.repo(), remote = %remote, branch = %branch))]
    fn push(&self, repo: &RepoHandle, remote: &str, branch: &str) -> Result<()> {
        self.run_checked(repo, &["push", "-u", remote, branch])?;
        Ok(())
    }
}
