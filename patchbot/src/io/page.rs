//! Loads the tracking issue page.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::core::listing::parse_repo_list;
use crate::core::types::RepoRef;

/// Where the issue page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    Url(String),
    File(PathBuf),
}

impl PageSource {
    /// A local file when given, otherwise the configured issue URL.
    pub fn choose(file: Option<PathBuf>, issue_url: &str) -> Result<Self> {
        match file {
            Some(path) => Ok(Self::File(path)),
            None if issue_url.trim().is_empty() => {
                bail!("no issue page: set issue_url in the config or pass --page")
            }
            None => Ok(Self::Url(issue_url.trim().to_string())),
        }
    }
}

/// Fetch the raw page HTML.
pub fn load_page(source: &PageSource) -> Result<String> {
    match source {
        PageSource::File(path) => {
            debug!(path = %path.display(), "reading issue page");
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
        }
        PageSource::Url(url) => {
            info!(url, "fetching issue page");
            let resp = reqwest::blocking::get(url).with_context(|| format!("fetch {url}"))?;
            if !resp.status().is_success() {
                bail!("fetch {url} failed: {}", resp.status());
            }
            resp.text().with_context(|| format!("read body of {url}"))
        }
    }
}

/// Load the page and parse its repository checklist.
pub fn list_repos(source: &PageSource) -> Result<Vec<RepoRef>> {
    let html = load_page(source)?;
    let repos = parse_repo_list(&html);
    info!(count = repos.len(), "repositories listed");
    Ok(repos)
}
