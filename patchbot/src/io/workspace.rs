//! Scratch workspace holding one clone per repository.
//!
//! The workspace is wiped and recreated at the start of every run. Operations
//! never change the process working directory; they receive a [`RepoHandle`]
//! carrying the clone's root instead.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::core::types::RepoRef;

/// The scratch directory for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

/// Explicit handle to a cloned repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHandle {
    repo: RepoRef,
    root: PathBuf,
}

impl RepoHandle {
    pub fn new(repo: RepoRef, root: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            root: root.into(),
        }
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// Root of the checkout.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `relative` inside the checkout.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

/// Delete any previous scratch directory at `root` and recreate it empty.
///
/// A missing directory is not an error.
pub fn create_work_dir(root: &Path) -> Result<Workspace> {
    match fs::remove_dir_all(root) {
        Ok(()) => debug!(root = %root.display(), "removed previous workspace"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("remove workspace {}", root.display()));
        }
    }
    fs::create_dir_all(root).with_context(|| format!("create workspace {}", root.display()))?;
    info!(root = %root.display(), "workspace ready");
    Ok(Workspace {
        root: root.to_path_buf(),
    })
}

impl Workspace {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a repository is cloned into: `<root>/<owner>/<name>`.
    pub fn clone_target(&self, repo: &RepoRef) -> PathBuf {
        self.root.join(&repo.owner).join(&repo.name)
    }

    /// Remove a previous clone of `repo`, so a retry starts from a pristine checkout.
    pub fn discard_clone(&self, repo: &RepoRef) -> Result<()> {
        let target = self.clone_target(repo);
        if target.exists() {
            debug!(target = %target.display(), "discarding previous clone");
            fs::remove_dir_all(&target)
                .with_context(|| format!("remove clone {}", target.display()))?;
        }
        Ok(())
    }

    /// Run `f` against the clone of `repo`.
    ///
    /// Fails if the clone does not exist. Nothing ambient is switched, so there
    /// is nothing to restore whichever way `f` exits.
    pub fn with_repo<T, F>(&self, repo: &RepoRef, f: F) -> Result<T>
    where
        F: FnOnce(&RepoHandle) -> Result<T>,
    {
        let target = self.clone_target(repo);
        if !target.is_dir() {
            bail!("{repo} is not cloned at {}", target.display());
        }
        let handle = RepoHandle::new(repo.clone(), target);
        f(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_work_dir_clears_previous_contents() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("work");
        fs::create_dir_all(root.join("old/repo")).expect("mkdir");
        fs::write(root.join("old/repo/file.txt"), "stale").expect("write");

        let workspace = create_work_dir(&root).expect("create");
        assert_eq!(workspace.root(), root.as_path());
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).expect("read dir").count(), 0);
    }

    #[test]
    fn create_work_dir_tolerates_absence() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("missing/work");
        create_work_dir(&root).expect("create");
        assert!(root.is_dir());
    }

    #[test]
    fn clone_targets_are_per_owner() {
        let temp = tempdir().expect("tempdir");
        let workspace = create_work_dir(temp.path()).expect("create");
        let a = workspace.clone_target(&RepoRef::new("alice", "theme"));
        let b = workspace.clone_target(&RepoRef::new("bob", "theme"));
        assert_ne!(a, b);
        assert!(a.ends_with("alice/theme"));
    }

    #[test]
    fn with_repo_passes_handle_rooted_at_clone() {
        let temp = tempdir().expect("tempdir");
        let workspace = create_work_dir(temp.path()).expect("create");
        let repo = RepoRef::new("alice", "theme");
        fs::create_dir_all(workspace.clone_target(&repo)).expect("mkdir");
        let cwd_before = std::env::current_dir().expect("cwd");

        let seen = workspace
            .with_repo(&repo, |handle| Ok(handle.root().to_path_buf()))
            .expect("with_repo");
        assert_eq!(seen, workspace.clone_target(&repo));

        let err = workspace
            .with_repo(&repo, |_| -> Result<()> { bail!("boom") })
            .expect_err("error propagates");
        assert_eq!(err.to_string(), "boom");
        assert_eq!(std::env::current_dir().expect("cwd"), cwd_before);
    }

    #[test]
    fn with_repo_requires_clone() {
        let temp = tempdir().expect("tempdir");
        let workspace = create_work_dir(temp.path()).expect("create");
        let err = workspace
            .with_repo(&RepoRef::new("alice", "theme"), |_| Ok(()))
            .expect_err("missing clone");
        assert!(err.to_string().contains("is not cloned"));
    }

    #[test]
    fn discard_clone_removes_directory() {
        let temp = tempdir().expect("tempdir");
        let workspace = create_work_dir(temp.path()).expect("create");
        let repo = RepoRef::new("alice", "theme");
        fs::create_dir_all(workspace.clone_target(&repo)).expect("mkdir");
        workspace.discard_clone(&repo).expect("discard");
        assert!(!workspace.clone_target(&repo).exists());
        workspace.discard_clone(&repo).expect("discard twice");
    }
}
