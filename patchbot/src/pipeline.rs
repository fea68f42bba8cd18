//! The per-repository pipeline.
//!
//! resolve → detect open PR → clone → prepare branch → patch → bump → publish.
//! Any error bubbles out to the caller, which hands it to the retry policy.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::types::RepoRef;
use crate::io::config::PortConfig;
use crate::io::gh::Hosting;
use crate::io::git::Vcs;
use crate::io::workspace::Workspace;
use crate::patch::Patch;
use crate::patch::bump::bump_repo_version;
use crate::publish::{PublishOutcome, PublishSettings, Publisher};

/// What happened to one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOutcome {
    /// The repository after resolution (may differ from the listed one).
    pub repo: RepoRef,
    /// Whether the patch changed any file.
    pub changed: bool,
    pub publish: PublishOutcome,
}

pub struct Pipeline<'a, H: Hosting, V: Vcs> {
    hosting: &'a H,
    vcs: &'a V,
    workspace: &'a Workspace,
    patch: &'a dyn Patch,
    layout: &'a PortConfig,
    settings: &'a PublishSettings,
}

impl<'a, H: Hosting, V: Vcs> Pipeline<'a, H, V> {
    pub fn new(
        hosting: &'a H,
        vcs: &'a V,
        workspace: &'a Workspace,
        patch: &'a dyn Patch,
        layout: &'a PortConfig,
        settings: &'a PublishSettings,
    ) -> Self {
        Self {
            hosting,
            vcs,
            workspace,
            patch,
            layout,
            settings,
        }
    }

    /// Run the whole pipeline for `listed`. Safe to call again after a failure:
    /// a leftover clone is discarded first.
    #[instrument(skip_all, fields(repo = %listed, patch = self.patch.name()))]
    pub fn process(&self, listed: &RepoRef) -> Result<RepoOutcome> {
        let repo = self
            .hosting
            .resolve_repo(listed)
            .with_context(|| format!("resolve {listed}"))?;
        let pr = self
            .hosting
            .find_open_pr(&repo, &self.settings.bot_login)
            .with_context(|| format!("look up open pull requests on {repo}"))?;

        self.workspace.discard_clone(&repo)?;
        let target = self.workspace.clone_target(&repo);
        info!(target = %target.display(), "cloning");
        self.hosting
            .clone_repo(&repo, &target)
            .with_context(|| format!("clone {repo}"))?;

        let publisher = Publisher::new(self.hosting, self.vcs, self.settings);
        self.workspace.with_repo(&repo, |handle| {
            let prepared = publisher.prepare(handle, &pr)?;

            let changed = self
                .patch
                .apply(handle)
                .with_context(|| format!("apply {} patch", self.patch.name()))?;
            if changed && !self.patch.bumps_version() {
                bump_repo_version(handle, self.layout)?;
            }
            if !changed {
                info!("patch made no changes");
            }

            let publish = publisher.finish(handle, &prepared, &self.patch.describe())?;
            Ok(RepoOutcome {
                repo: repo.clone(),
                changed,
                publish,
            })
        })
    }
}
