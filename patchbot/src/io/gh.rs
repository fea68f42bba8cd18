//! Hosting-platform adapter built on the `gh` CLI.
//!
//! The [`Hosting`] trait decouples the pipeline from `gh`; tests use scripted
//! implementations that never spawn processes.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{PullRequestState, RepoRef};
use crate::io::process::{ProcessLimits, run_checked, run_command};
use crate::io::workspace::RepoHandle;

/// Raised when a repository no longer resolves upstream.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("repository {repo} not found: {detail}")]
    NotFound { repo: String, detail: String },
}

/// Pull request to open against upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrRequest {
    /// `<bot>:<branch>` on the fork.
    pub head: String,
    pub title: String,
    pub body: String,
}

/// Operations against the hosting platform.
pub trait Hosting {
    /// Canonical owner/name for `repo`, following renames and transfers.
    fn resolve_repo(&self, repo: &RepoRef) -> Result<RepoRef>;
    /// Open PR authored by `author` on `repo`, if any.
    fn find_open_pr(&self, repo: &RepoRef, author: &str) -> Result<PullRequestState>;
    /// Clone `repo` into `dest`.
    fn clone_repo(&self, repo: &RepoRef, dest: &Path) -> Result<()>;
    /// Fork the checkout's upstream to `owner` (the authenticated account) and
    /// return the fork. Idempotent upstream; the fork may carry a different name
    /// when `owner` already had a repository with the upstream's name.
    fn fork_repo(&self, repo: &RepoHandle, owner: &str) -> Result<RepoRef>;
    /// Open a pull request and return its URL.
    fn create_pr(&self, repo: &RepoHandle, request: &PrRequest) -> Result<String>;
}

/// [`Hosting`] backed by the `gh` binary.
#[derive(Debug, Clone)]
pub struct GhCli {
    limits: ProcessLimits,
}

impl GhCli {
    pub fn new(limits: ProcessLimits) -> Self {
        Self { limits }
    }

    fn command(&self, args: &[&str], workdir: Option<&Path>) -> Command {
        let mut cmd = Command::new("gh");
        cmd.args(args);
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[derive(Debug, Deserialize)]
struct RepoView {
    name: String,
    owner: RepoOwner,
}

#[derive(Debug, Deserialize)]
struct RepoOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrListEntry {
    number: u64,
    head_ref_name: String,
}

/// Parse `gh repo view --json name,owner` output.
pub fn parse_repo_view(repo: &RepoRef, json: &str) -> Result<RepoRef> {
    let view: RepoView = serde_json::from_str(json)
        .with_context(|| format!("parse gh repo view output for {repo}"))?;
    Ok(repo.renamed(view.owner.login, view.name))
}

/// First fork name in `gh api .../forks --jq` output, one name per line.
pub fn parse_fork_name(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Parse `gh pr list --json number,headRefName` output. The first entry wins.
pub fn parse_pr_list(json: &str) -> Result<PullRequestState> {
    let entries: Vec<PrListEntry> =
        serde_json::from_str(json).context("parse gh pr list output")?;
    Ok(entries
        .into_iter()
        .next()
        .map(|entry| {
            debug!(number = entry.number, branch = %entry.head_ref_name, "open pull request found");
            PullRequestState::open(entry.head_ref_name)
        })
        .unwrap_or_default())
}

impl Hosting for GhCli {
    #[instrument(skip_all, fields(repo = %repo))]
    fn resolve_repo(&self, repo: &RepoRef) -> Result<RepoRef> {
        let full_name = repo.full_name();
        let cmd = self.command(&["repo", "view", &full_name, "--json", "name,owner"], None);
        let output = run_command(cmd, self.limits)?;
        if !output.success() {
            return Err(ResolveError::NotFound {
                repo: full_name,
                detail: output.failure_detail(),
            }
            .into());
        }
        let resolved = parse_repo_view(repo, &output.stdout_text())?;
        if resolved.full_name() != full_name {
            info!(to = %resolved, "repository moved upstream");
        }
        Ok(resolved)
    }

    #[instrument(skip_all, fields(repo = %repo, author = %author))]
    fn find_open_pr(&self, repo: &RepoRef, author: &str) -> Result<PullRequestState> {
        let full_name = repo.full_name();
        let cmd = self.command(
            &[
                "pr",
                "list",
                "--repo",
                &full_name,
                "--author",
                author,
                "--state",
                "open",
                "--json",
                "number,headRefName",
            ],
            None,
        );
        let output = run_checked(cmd, self.limits)?;
        parse_pr_list(&output.stdout_text())
    }

    #[instrument(skip_all, fields(repo = %repo))]
    fn clone_repo(&self, repo: &RepoRef, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create clone parent {}", parent.display()))?;
        }
        let full_name = repo.full_name();
        let dest_arg = dest.to_string_lossy();
        let cmd = self.command(&["repo", "clone", &full_name, &dest_arg], None);
        run_checked(cmd, self.limits)?;
        Ok(())
    }

    #[instrument(skip_all, fields(repo = %repo.repo(), owner = %owner))]
    fn fork_repo(&self, repo: &RepoHandle, owner: &str) -> Result<RepoRef> {
        let cmd = self.command(&["repo", "fork", "--remote=false"], Some(repo.root()));
        run_checked(cmd, self.limits)?;

        let upstream = repo.repo();
        let endpoint = format!("repos/{}/forks", upstream.full_name());
        let login = serde_json::to_string(&owner.to_ascii_lowercase())?;
        let filter = format!(".[] | select(.owner.login | ascii_downcase == {login}) | .name");
        let cmd = self.command(&["api", "--paginate", &endpoint, "--jq", &filter], None);
        let output = run_checked(cmd, self.limits)?;

        let name = match parse_fork_name(&output.stdout_text()) {
            Some(name) => name,
            None => {
                warn!("fork not listed yet, assuming the upstream name");
                upstream.name.clone()
            }
        };
        if name != upstream.name {
            info!(fork = %name, "fork is named differently from upstream");
        }
        Ok(RepoRef::new(owner, name))
    }

    #[instrument(skip_all, fields(repo = %repo.repo(), head = %request.head))]
    fn create_pr(&self, repo: &RepoHandle, request: &PrRequest) -> Result<String> {
        let full_name = repo.repo().full_name();
        let cmd = self.command(
            &[
                "pr",
                "create",
                "--repo",
                &full_name,
                "--head",
                &request.head,
                "--title",
                &request.title,
                "--body",
                &request.body,
            ],
            Some(repo.root()),
        );
        let output = run_checked(cmd, self.limits)?;
        let url = output
            .stdout_text()
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string();
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_view_follows_renames() {
        let repo = RepoRef::new("old", "theme");
        let json = r#"{"name":"theme-zed","owner":{"id":"MDQ6","login":"new"}}"#;
        let resolved = parse_repo_view(&repo, json).expect("parse");
        assert_eq!(resolved.full_name(), "new/theme-zed");
        assert_eq!(resolved.source_url, repo.source_url);
    }

    #[test]
    fn repo_view_rejects_garbage() {
        let repo = RepoRef::new("old", "theme");
        assert!(parse_repo_view(&repo, "not json").is_err());
    }

    #[test]
    fn pr_list_empty_means_no_pr() {
        assert_eq!(parse_pr_list("[]").expect("parse"), PullRequestState::none());
    }

    #[test]
    fn pr_list_takes_first_branch() {
        let json = r#"[{"number":7,"headRefName":"patchbot-20250101"},{"number":9,"headRefName":"other"}]"#;
        assert_eq!(
            parse_pr_list(json).expect("parse"),
            PullRequestState::open("patchbot-20250101")
        );
    }

    #[test]
    fn fork_name_is_first_listed_line() {
        assert_eq!(parse_fork_name("\ntheme-1\ntheme\n"), Some("theme-1".to_string()));
        assert_eq!(parse_fork_name("  \n"), None);
    }

    #[test]
    fn resolve_error_names_repo() {
        let err = ResolveError::NotFound {
            repo: "alice/gone".to_string(),
            detail: "Could not resolve to a Repository".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "repository alice/gone not found: Could not resolve to a Repository"
        );
    }
}
