//! Shared value types passed between pipeline stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A repository named on the tracking issue.
///
/// `owner`/`name` may be stale until the resolver has canonicalized them
/// against upstream. `source_url` is the link the entry was scraped from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub source_url: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        let source_url = format!("https://github.com/{owner}/{name}");
        Self {
            owner,
            name,
            source_url,
        }
    }

    /// `owner/name`, the form `gh` expects for `--repo`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Same repository under a (possibly) new owner/name, keeping the source link.
    pub fn renamed(&self, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            source_url: self.source_url.clone(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Open pull request authored by the bot, if any.
///
/// Queried fresh per repository; never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestState {
    pub exists: bool,
    pub branch_name: Option<String>,
}

impl PullRequestState {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn open(branch: impl Into<String>) -> Self {
        Self {
            exists: true,
            branch_name: Some(branch.into()),
        }
    }

    /// Branch to update, when an open PR exists.
    pub fn existing_branch(&self) -> Option<&str> {
        if self.exists {
            self.branch_name.as_deref()
        } else {
            None
        }
    }
}
