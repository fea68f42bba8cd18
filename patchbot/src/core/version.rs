//! Semantic version bumps applied as targeted text edits.
//!
//! Manifests are edited in place with a narrowly scoped substitution on the
//! `version` field instead of a parse/serialize round trip, so the author's
//! formatting, key order and comments survive the bump.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::core::manifest::ManifestFormat;

static SEMVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)((?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?)$",
    )
    .expect("semver regex should be valid")
});

static TOML_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^(\s*version\s*=\s*")([^"\n]*)(")"#).expect("toml version regex")
});

static JSON_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"("version"\s*:\s*")([^"\n]*)(")"#).expect("json version regex")
});

/// Errors raised while bumping a version.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid semantic version '{0}'")]
    Invalid(String),
    #[error("no version field found")]
    MissingField,
    #[error("patch component of '{0}' overflows")]
    Overflow(String),
}

/// Increment the patch component, keeping major, minor, pre-release and build metadata.
///
/// `1.2.3` becomes `1.2.4`; `1.2.3-beta.1+b5` becomes `1.2.4-beta.1+b5`.
pub fn bump_patch(version: &str) -> Result<String, VersionError> {
    let trimmed = version.trim();
    let caps = SEMVER_RE
        .captures(trimmed)
        .ok_or_else(|| VersionError::Invalid(version.to_string()))?;
    let patch: u64 = caps[3]
        .parse()
        .map_err(|_| VersionError::Invalid(version.to_string()))?;
    let next = patch
        .checked_add(1)
        .ok_or_else(|| VersionError::Overflow(version.to_string()))?;
    Ok(format!("{}.{}.{}{}", &caps[1], &caps[2], next, &caps[4]))
}

/// Result of rewriting a manifest's version field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEdit {
    pub old_version: String,
    pub new_version: String,
    pub text: String,
}

/// Bump the first `version` field in `text`, leaving every other byte untouched.
pub fn bump_version_field(text: &str, format: ManifestFormat) -> Result<VersionEdit, VersionError> {
    let re = match format {
        ManifestFormat::Toml => &*TOML_VERSION_RE,
        ManifestFormat::Json => &*JSON_VERSION_RE,
    };
    let caps = re.captures(text).ok_or(VersionError::MissingField)?;
    let old_version = caps[2].to_string();
    let new_version = bump_patch(&old_version)?;

    let text = re
        .replacen(text, 1, |caps: &Captures<'_>| {
            format!("{}{}{}", &caps[1], new_version, &caps[3])
        })
        .into_owned();

    Ok(VersionEdit {
        old_version,
        new_version,
        text,
    })
}
