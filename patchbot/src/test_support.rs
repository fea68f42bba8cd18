//! Scripted fakes for the hosting and git seams.
//!
//! Fakes record every call so tests can assert on order and on what was never
//! invoked. Nothing here spawns a process.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::core::types::{PullRequestState, RepoRef};
use crate::io::gh::{Hosting, PrRequest, ResolveError};
use crate::io::git::{CommitOutcome, Vcs};
use crate::io::workspace::RepoHandle;

/// Hosting fake: resolves repos, clones fixture files, records forks and PRs.
#[derive(Default)]
pub struct ScriptedHosting {
    /// `owner/name` → canonical repo. Missing entries resolve to themselves.
    pub renames: BTreeMap<String, RepoRef>,
    /// `owner/name` entries that no longer exist upstream.
    pub missing: Vec<String>,
    /// Open PR returned for every repo.
    pub open_pr: PullRequestState,
    /// Files (relative path → contents) written into every clone.
    pub files: Vec<(String, String)>,
    /// Name the bot's fork gets; the upstream name when unset.
    pub fork_name: Option<String>,
    /// Fail this many clone attempts before succeeding.
    pub clone_failures: Cell<u32>,
    clones: Cell<u32>,
    forks: Cell<u32>,
    created: RefCell<Vec<PrRequest>>,
}

impl ScriptedHosting {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, contents)| (path.to_string(), contents.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    /// Mark `owner/name` as no longer existing upstream.
    pub fn with_missing(mut self, full_name: impl Into<String>) -> Self {
        self.missing.push(full_name.into());
        self
    }

    pub fn with_fork_name(mut self, name: impl Into<String>) -> Self {
        self.fork_name = Some(name.into());
        self
    }

    pub fn with_open_pr(mut self, state: PullRequestState) -> Self {
        self.open_pr = state;
        self
    }

    pub fn clones(&self) -> u32 {
        self.clones.get()
    }

    pub fn forks(&self) -> u32 {
        self.forks.get()
    }

    pub fn created_prs(&self) -> Vec<PrRequest> {
        self.created.borrow().clone()
    }
}

impl Hosting for ScriptedHosting {
    fn resolve_repo(&self, repo: &RepoRef) -> Result<RepoRef> {
        let full_name = repo.full_name();
        if self.missing.contains(&full_name) {
            return Err(ResolveError::NotFound {
                repo: full_name,
                detail: "Could not resolve to a Repository".to_string(),
            }
            .into());
        }
        Ok(self
            .renames
            .get(&full_name)
            .cloned()
            .unwrap_or_else(|| repo.clone()))
    }

    fn find_open_pr(&self, _repo: &RepoRef, _author: &str) -> Result<PullRequestState> {
        Ok(self.open_pr.clone())
    }

    fn clone_repo(&self, _repo: &RepoRef, dest: &Path) -> Result<()> {
        self.clones.set(self.clones.get() + 1);
        if self.clone_failures.get() > 0 {
            self.clone_failures.set(self.clone_failures.get() - 1);
            bail!("scripted clone failure");
        }
        fs::create_dir_all(dest).with_context(|| format!("create {}", dest.display()))?;
        for (rel, contents) in &self.files {
            let path = dest.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        }
        Ok(())
    }

    fn fork_repo(&self, repo: &RepoHandle, owner: &str) -> Result<RepoRef> {
        self.forks.set(self.forks.get() + 1);
        let name = self
            .fork_name
            .clone()
            .unwrap_or_else(|| repo.repo().name.clone());
        Ok(RepoRef::new(owner, name))
    }

    fn create_pr(&self, repo: &RepoHandle, request: &PrRequest) -> Result<String> {
        let mut created = self.created.borrow_mut();
        created.push(request.clone());
        Ok(format!(
            "https://github.com/{}/pull/{}",
            repo.repo().full_name(),
            created.len()
        ))
    }
}

/// A recorded [`Vcs`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EnsureRemote { name: String, url: String },
    CheckoutNewBranch(String),
    CheckoutRemoteBranch { remote: String, branch: String },
    AddAll,
    Commit,
    Push(String),
}

/// Git fake. Commits succeed unless built with [`ScriptedVcs::nothing_to_commit`].
#[derive(Default)]
pub struct ScriptedVcs {
    pub commit_outcome: Option<CommitOutcome>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedVcs {
    pub fn nothing_to_commit() -> Self {
        Self {
            commit_outcome: Some(CommitOutcome::NothingToCommit),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Vcs for ScriptedVcs {
    fn ensure_remote(&self, _repo: &RepoHandle, name: &str, url: &str) -> Result<()> {
        self.record(Call::EnsureRemote {
            name: name.to_string(),
            url: url.to_string(),
        });
        Ok(())
    }

    fn checkout_new_branch(&self, _repo: &RepoHandle, branch: &str) -> Result<()> {
        self.record(Call::CheckoutNewBranch(branch.to_string()));
        Ok(())
    }

    fn checkout_remote_branch(
        &self,
        _repo: &RepoHandle,
        remote: &str,
        branch: &str,
    ) -> Result<()> {
        self.record(Call::CheckoutRemoteBranch {
            remote: remote.to_string(),
            branch: branch.to_string(),
        });
        Ok(())
    }

    fn add_all(&self, _repo: &RepoHandle) -> Result<()> {
        self.record(Call::AddAll);
        Ok(())
    }

    fn commit(&self, _repo: &RepoHandle, _message: &str) -> Result<CommitOutcome> {
        self.record(Call::Commit);
        Ok(self.commit_outcome.unwrap_or(CommitOutcome::Committed))
    }

    fn push(&self, _repo: &RepoHandle, _remote: &str, branch: &str) -> Result<()> {
        self.record(Call::Push(branch.to_string()));
        Ok(())
    }
}
