//! Fork, branch, commit, push and open (or update) the pull request.
//!
//! Publishing is split in two so the checkout is on its final branch before any
//! file is patched:
//!
//! - [`Publisher::prepare`]: fork → fork remote → new branch, or the existing
//!   PR branch when one is already open (the update path).
//! - [`Publisher::finish`]: stage → commit → push → create PR. Nothing to
//!   commit stops here as [`PublishOutcome::Skipped`]; the update path relies
//!   on the PR that is already open.

use anyhow::{Context, Result};
use chrono::Utc;
use minijinja::{Environment, context};
use tracing::{info, instrument};

use crate::core::types::{PullRequestState, RepoRef};
use crate::io::config::BotConfig;
use crate::io::gh::{Hosting, PrRequest};
use crate::io::git::{CommitOutcome, Vcs};
use crate::io::workspace::RepoHandle;

/// Settings the publisher needs from the bot config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub bot_login: String,
    pub fork_remote: String,
    pub branch_prefix: String,
    pub commit_message: String,
    pub pr_title: String,
    pub pr_body: String,
    pub issue_url: String,
    pub source_url: String,
    /// Stop after committing; nothing is pushed or opened.
    pub dry_run: bool,
}

impl PublishSettings {
    pub fn from_config(cfg: &BotConfig, dry_run: bool) -> Self {
        Self {
            bot_login: cfg.bot_login.clone(),
            fork_remote: cfg.fork_remote.clone(),
            branch_prefix: cfg.branch_prefix.clone(),
            commit_message: cfg.commit_message.clone(),
            pr_title: cfg.pr_title.clone(),
            pr_body: cfg.pr_body.clone(),
            issue_url: cfg.issue_url.clone(),
            source_url: cfg.source_url.clone(),
            dry_run,
        }
    }
}

/// Branch the checkout is on after [`Publisher::prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBranch {
    pub branch: String,
    /// True when an open PR already tracks this branch.
    pub updating: bool,
}

/// Terminal state of the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A new pull request was opened.
    Opened { branch: String, url: String },
    /// The branch of an already-open pull request was pushed.
    Updated { branch: String },
    /// Nothing to commit; nothing pushed, no PR action.
    Skipped,
    /// Committed locally; pushing was disabled.
    DryRun { branch: String },
}

pub struct Publisher<'a, H: Hosting, V: Vcs> {
    hosting: &'a H,
    vcs: &'a V,
    settings: &'a PublishSettings,
}

impl<'a, H: Hosting, V: Vcs> Publisher<'a, H, V> {
    pub fn new(hosting: &'a H, vcs: &'a V, settings: &'a PublishSettings) -> Self {
        Self {
            hosting,
            vcs,
            settings,
        }
    }

    /// Fork, point the fork remote at it and switch to the working branch.
    #[instrument(skip_all, fields(repo = %repo.repo()))]
    pub fn prepare(&self, repo: &RepoHandle, pr: &PullRequestState) -> Result<PreparedBranch> {
        let remote = &self.settings.fork_remote;
        let fork = self
            .hosting
            .fork_repo(repo, &self.settings.bot_login)
            .context("fork repository")?;
        self.vcs
            .ensure_remote(repo, remote, &fork_url(&fork))
            .context("configure fork remote")?;

        let prepared = match pr.existing_branch() {
            Some(branch) => {
                info!(branch, "pull request already open, updating its branch");
                self.vcs
                    .checkout_remote_branch(repo, remote, branch)
                    .with_context(|| format!("check out existing branch {branch}"))?;
                PreparedBranch {
                    branch: branch.to_string(),
                    updating: true,
                }
            }
            None => {
                let branch = new_branch_name(&self.settings.branch_prefix);
                self.vcs
                    .checkout_new_branch(repo, &branch)
                    .with_context(|| format!("create branch {branch}"))?;
                PreparedBranch {
                    branch,
                    updating: false,
                }
            }
        };
        Ok(prepared)
    }

    /// Commit whatever the patch changed and publish it.
    #[instrument(skip_all, fields(repo = %repo.repo(), branch = %prepared.branch))]
    pub fn finish(
        &self,
        repo: &RepoHandle,
        prepared: &PreparedBranch,
        patch_description: &str,
    ) -> Result<PublishOutcome> {
        self.vcs.add_all(repo).context("stage changes")?;
        match self
            .vcs
            .commit(repo, &self.settings.commit_message)
            .context("commit changes")?
        {
            CommitOutcome::NothingToCommit => {
                info!("nothing to commit, skipping");
                return Ok(PublishOutcome::Skipped);
            }
            CommitOutcome::Committed => {}
        }

        let branch = prepared.branch.clone();
        if self.settings.dry_run {
            info!("dry run, not pushing");
            return Ok(PublishOutcome::DryRun { branch });
        }

        self.vcs
            .push(repo, &self.settings.fork_remote, &branch)
            .context("push branch")?;
        if prepared.updating {
            info!("pushed to existing pull request");
            return Ok(PublishOutcome::Updated { branch });
        }

        let request = PrRequest {
            head: format!("{}:{}", self.settings.bot_login, branch),
            title: render_template(&self.settings.pr_title, repo, self.settings, patch_description)
                .context("render pr title")?
                .trim()
                .to_string(),
            body: render_template(&self.settings.pr_body, repo, self.settings, patch_description)
                .context("render pr body")?,
        };
        let url = self
            .hosting
            .create_pr(repo, &request)
            .context("create pull request")?;
        info!(url = %url, "opened pull request");
        Ok(PublishOutcome::Opened { branch, url })
    }
}

/// Push URL for `fork`, which may be named differently from its upstream.
pub fn fork_url(fork: &RepoRef) -> String {
    format!("https://github.com/{}/{}.git", fork.owner, fork.name)
}

/// `<prefix>-<UTC timestamp>`.
pub fn new_branch_name(prefix: &str) -> String {
    format!("{prefix}-{}", Utc::now().format("%Y%m%d%H%M%S"))
}

/// Render a PR title/body template.
pub fn render_template(
    template: &str,
    repo: &RepoHandle,
    settings: &PublishSettings,
    patch_description: &str,
) -> Result<String> {
    let env = Environment::new();
    let rendered = env.render_str(
        template,
        context! {
            repo => repo.repo().full_name(),
            issue_url => settings.issue_url.as_str(),
            source_url => settings.source_url.as_str(),
            patch => patch_description,
        },
    )?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, ScriptedHosting, ScriptedVcs};

    fn settings() -> PublishSettings {
        PublishSettings::from_config(
            &BotConfig {
                bot_login: "theme-bot".to_string(),
                issue_url: "https://github.com/acme/zed/issues/1".to_string(),
                source_url: "https://github.com/acme/patchbot".to_string(),
                ..BotConfig::default()
            },
            false,
        )
    }

    fn handle() -> RepoHandle {
        RepoHandle::new(RepoRef::new("alice", "theme"), "/tmp/work/alice/theme")
    }

    #[test]
    fn new_pr_path_runs_every_step_in_order() {
        let hosting = ScriptedHosting::default();
        let vcs = ScriptedVcs::default();
        let settings = settings();
        let publisher = Publisher::new(&hosting, &vcs, &settings);
        let repo = handle();

        let prepared = publisher
            .prepare(&repo, &PullRequestState::none())
            .expect("prepare");
        assert!(prepared.branch.starts_with("patchbot-"));
        assert!(!prepared.updating);
        let outcome = publisher.finish(&repo, &prepared, "Rename x").expect("finish");

        assert_eq!(
            outcome,
            PublishOutcome::Opened {
                branch: prepared.branch.clone(),
                url: "https://github.com/alice/theme/pull/1".to_string(),
            }
        );
        let vcs_calls = vcs.calls();
        assert_eq!(
            vcs_calls,
            vec![
                Call::EnsureRemote {
                    name: "fork".to_string(),
                    url: "https://github.com/theme-bot/theme.git".to_string(),
                },
                Call::CheckoutNewBranch(prepared.branch.clone()),
                Call::AddAll,
                Call::Commit,
                Call::Push(prepared.branch.clone()),
            ]
        );
        let created = hosting.created_prs();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].head, format!("theme-bot:{}", prepared.branch));
        assert_eq!(created[0].title, "Rename x");
        assert!(created[0].body.contains("https://github.com/acme/zed/issues/1"));
        assert!(created[0].body.contains("https://github.com/acme/patchbot"));
        assert_eq!(hosting.forks(), 1);
    }

    #[test]
    fn remote_points_at_renamed_fork() {
        let hosting = ScriptedHosting::default().with_fork_name("theme-1");
        let vcs = ScriptedVcs::default();
        let settings = settings();
        let publisher = Publisher::new(&hosting, &vcs, &settings);

        publisher
            .prepare(&handle(), &PullRequestState::none())
            .expect("prepare");

        assert_eq!(
            vcs.calls()[0],
            Call::EnsureRemote {
                name: "fork".to_string(),
                url: "https://github.com/theme-bot/theme-1.git".to_string(),
            }
        );
    }

    #[test]
    fn nothing_to_commit_skips_push_and_pr() {
        let hosting = ScriptedHosting::default();
        let vcs = ScriptedVcs::nothing_to_commit();
        let settings = settings();
        let publisher = Publisher::new(&hosting, &vcs, &settings);
        let repo = handle();

        let prepared = publisher
            .prepare(&repo, &PullRequestState::none())
            .expect("prepare");
        let outcome = publisher.finish(&repo, &prepared, "Rename x").expect("finish");

        assert_eq!(outcome, PublishOutcome::Skipped);
        assert!(!vcs.calls().iter().any(|call| matches!(call, Call::Push(_))));
        assert!(hosting.created_prs().is_empty());
    }

    #[test]
    fn existing_pr_updates_its_branch() {
        let hosting = ScriptedHosting::default();
        let vcs = ScriptedVcs::default();
        let settings = settings();
        let publisher = Publisher::new(&hosting, &vcs, &settings);
        let repo = handle();

        let prepared = publisher
            .prepare(&repo, &PullRequestState::open("patchbot-20240101000000"))
            .expect("prepare");
        assert!(prepared.updating);
        let outcome = publisher.finish(&repo, &prepared, "Rename x").expect("finish");

        assert_eq!(
            outcome,
            PublishOutcome::Updated {
                branch: "patchbot-20240101000000".to_string()
            }
        );
        assert!(vcs.calls().contains(&Call::CheckoutRemoteBranch {
            remote: "fork".to_string(),
            branch: "patchbot-20240101000000".to_string(),
        }));
        assert!(hosting.created_prs().is_empty());
    }

    #[test]
    fn dry_run_commits_but_does_not_push() {
        let hosting = ScriptedHosting::default();
        let vcs = ScriptedVcs::default();
        let settings = PublishSettings {
            dry_run: true,
            ..settings()
        };
        let publisher = Publisher::new(&hosting, &vcs, &settings);
        let repo = handle();

        let prepared = publisher
            .prepare(&repo, &PullRequestState::none())
            .expect("prepare");
        let outcome = publisher.finish(&repo, &prepared, "Rename x").expect("finish");

        assert!(matches!(outcome, PublishOutcome::DryRun { .. }));
        assert!(vcs.calls().contains(&Call::Commit));
        assert!(!vcs.calls().iter().any(|call| matches!(call, Call::Push(_))));
        assert!(hosting.created_prs().is_empty());
    }

    #[test]
    fn template_sees_repo_and_links() {
        let rendered = render_template(
            "{{ patch }} for {{ repo }} ({{ issue_url }})",
            &handle(),
            &settings(),
            "Port manifest",
        )
        .expect("render");
        assert_eq!(
            rendered,
            "Port manifest for alice/theme (https://github.com/acme/zed/issues/1)"
        );
    }

    #[test]
    fn branch_names_use_prefix_and_timestamp() {
        let name = new_branch_name("bot");
        let stamp = name.strip_prefix("bot-").expect("prefix");
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }
}
