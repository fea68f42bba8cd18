//! Repository-level version bump.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::manifest::ManifestFormat;
use crate::core::version::bump_version_field;
use crate::io::config::PortConfig;
use crate::io::workspace::RepoHandle;

/// Raised when there is no manifest to bump.
#[derive(Debug, thiserror::Error)]
pub enum BumpError {
    #[error("{repo} has no manifest (looked for {})", .candidates.join(", "))]
    NoManifest {
        repo: String,
        candidates: Vec<String>,
    },
}

/// What a bump changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpOutcome {
    pub path: PathBuf,
    pub format: ManifestFormat,
    pub old_version: String,
    pub new_version: String,
}

/// Bump the patch version of whichever manifest is present.
///
/// The TOML manifest wins over the legacy JSON one. Only the version field is
/// rewritten.
#[instrument(skip_all, fields(repo = %repo.repo()))]
pub fn bump_repo_version(repo: &RepoHandle, layout: &PortConfig) -> Result<BumpOutcome> {
    let candidates = [
        (&layout.manifest_file, ManifestFormat::Toml),
        (&layout.legacy_file, ManifestFormat::Json),
    ];
    let Some((path, format)) = candidates
        .iter()
        .map(|(rel, format)| (repo.path(rel), *format))
        .find(|(path, _)| path.is_file())
    else {
        return Err(BumpError::NoManifest {
            repo: repo.repo().full_name(),
            candidates: candidates
                .iter()
                .map(|(rel, _)| rel.display().to_string())
                .collect(),
        }
        .into());
    };

    let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let edit = bump_version_field(&text, format)
        .with_context(|| format!("bump version in {}", path.display()))?;
    fs::write(&path, &edit.text).with_context(|| format!("write {}", path.display()))?;
    info!(
        manifest = %path.display(),
        format = format.as_str(),
        from = %edit.old_version,
        to = %edit.new_version,
        "bumped version"
    );

    Ok(BumpOutcome {
        path,
        format,
        old_version: edit.old_version,
        new_version: edit.new_version,
    })
}
