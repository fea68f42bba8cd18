//! Patch appliers and the repository-level version bumper.
//!
//! A patch inspects a checkout and possibly rewrites files, reporting whether
//! anything changed. Patches hold only their settings, so one instance is
//! reused for every repository in a run.

pub mod bump;
pub mod port;
pub mod rename;

use anyhow::Result;
use clap::ValueEnum;

use crate::io::config::BotConfig;
use crate::io::workspace::RepoHandle;

pub use port::ManifestPort;
pub use rename::AttributeRename;

/// A stateless transform over a checkout.
pub trait Patch {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// One-line description used in PR titles and bodies.
    fn describe(&self) -> String;

    /// Apply the transform. Returns true if any file changed.
    fn apply(&self, repo: &RepoHandle) -> Result<bool>;

    /// True if `apply` already bumps the manifest version itself.
    fn bumps_version(&self) -> bool {
        false
    }
}

/// Patches selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PatchKind {
    /// Rename a theme attribute key.
    Rename,
    /// Port `extension.json` to `extension.toml`.
    Port,
}

impl PatchKind {
    /// Build the configured patch.
    pub fn build(self, cfg: &BotConfig) -> Result<Box<dyn Patch>> {
        Ok(match self {
            Self::Rename => Box::new(AttributeRename::from_config(&cfg.rename)?),
            Self::Port => Box::new(ManifestPort::from_config(&cfg.port)),
        })
    }
}
