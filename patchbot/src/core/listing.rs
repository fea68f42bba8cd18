//! Extracts the repository checklist from a tracking issue page.
//!
//! The page is treated as text. Only checklist entries (`<li>` elements with the
//! `task-list-item` class) count, so navigation and footer lists are ignored.
//! Each entry contributes the first link in its own text, up to the next nested
//! item or its closing tag. Links to issues (the tracking issue itself, cross
//! references) are skipped.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::RepoRef;

const HOST_PREFIX: &str = "https://github.com";
const TASK_ITEM_CLASS: &str = "task-list-item";

static LIST_ITEM_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<li\b([^>]*)>").expect("list item regex should be valid")
});

static ITEM_BOUNDARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<li\b|</li\s*>").expect("item boundary regex should be valid")
});

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bclass\s*=\s*["']([^"']*)["']"#).expect("class regex should be valid")
});

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#)
        .expect("href regex should be valid")
});

/// Parse every checklist entry into a [`RepoRef`], in page order.
///
/// Duplicate `owner/name` pairs are dropped after their first occurrence.
pub fn parse_repo_list(html: &str) -> Vec<RepoRef> {
    let mut seen = HashSet::new();
    let mut repos = Vec::new();
    for caps in LIST_ITEM_OPEN_RE.captures_iter(html) {
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        if !is_task_item(attrs) {
            continue;
        }
        let rest = &html[caps.get(0).map_or(html.len(), |m| m.end())..];
        let body_end = ITEM_BOUNDARY_RE.find(rest).map_or(rest.len(), |m| m.start());
        let Some(href) = HREF_RE
            .captures(&rest[..body_end])
            .map(|caps| caps[1].to_string())
        else {
            continue;
        };
        let Some(repo) = repo_from_href(&href) else {
            continue;
        };
        if seen.insert(repo.full_name()) {
            repos.push(repo);
        }
    }
    repos
}

fn is_task_item(attrs: &str) -> bool {
    CLASS_RE.captures(attrs).is_some_and(|caps| {
        caps[1]
            .split_whitespace()
            .any(|class| class == TASK_ITEM_CLASS)
    })
}

/// Turn a link target into a repository reference.
///
/// Returns `None` for issue links and targets with fewer than two path segments.
pub fn repo_from_href(href: &str) -> Option<RepoRef> {
    let href = href.trim().replace("&amp;", "&");
    if href.contains("issues") {
        return None;
    }
    let href = href
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let url = if href.starts_with('/') {
        format!("{HOST_PREFIX}{href}")
    } else {
        href.to_string()
    };

    let path = url
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, path)| path).unwrap_or(""))
        .unwrap_or(url.as_str());
    let mut segments = path.rsplit('/').filter(|segment| !segment.is_empty());
    let name = segments.next()?;
    let owner = segments.next()?;

    Some(RepoRef {
        owner: owner.to_string(),
        name: name.trim_end_matches(".git").to_string(),
        source_url: url.clone(),
    })
}
