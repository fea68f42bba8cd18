//! Theme attribute key rename.
//!
//! Theme files are treated as raw text: the old key is replaced verbatim
//! wherever it appears. Every matching file in the theme directory is visited,
//! since some repositories ship several themes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument};

use crate::io::config::RenameConfig;
use crate::io::workspace::RepoHandle;
use crate::patch::Patch;

/// Replace `old_key` with `new_key` in every theme file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRename {
    dir: PathBuf,
    extension: String,
    old_key: String,
    new_key: String,
}

impl AttributeRename {
    pub fn new(
        dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        old_key: impl Into<String>,
        new_key: impl Into<String>,
    ) -> Result<Self> {
        let rename = Self {
            dir: dir.into(),
            extension: extension.into(),
            old_key: old_key.into(),
            new_key: new_key.into(),
        };
        if rename.old_key.is_empty() {
            bail!("rename key must be non-empty");
        }
        // A new key containing the old one would match again on the next pass.
        if rename.new_key.contains(&rename.old_key) {
            bail!(
                "new key {} contains old key {}",
                rename.new_key,
                rename.old_key
            );
        }
        Ok(rename)
    }

    pub fn from_config(cfg: &RenameConfig) -> Result<Self> {
        Self::new(&cfg.dir, &cfg.extension, &cfg.old_key, &cfg.new_key)
    }

    /// Theme files directly under the theme directory, sorted by path.
    pub fn theme_files(&self, repo_root: &Path) -> Result<Vec<PathBuf>> {
        let dir = repo_root.join(&self.dir);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
            let path = entry
                .with_context(|| format!("read entry in {}", dir.display()))?
                .path();
            let matches = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.to_string_lossy() == self.extension);
            if matches {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl Patch for AttributeRename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn describe(&self) -> String {
        format!("Rename {} to {} in themes", self.old_key, self.new_key)
    }

    #[instrument(skip_all, fields(repo = %repo.repo()))]
    fn apply(&self, repo: &RepoHandle) -> Result<bool> {
        let files = self.theme_files(repo.root())?;
        if files.is_empty() {
            debug!(dir = %self.dir.display(), "no theme files found");
        }
        let mut changed = false;
        for path in files {
            let text =
                fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            if !text.contains(&self.old_key) {
                continue;
            }
            let count = text.matches(&self.old_key).count();
            let updated = text.replace(&self.old_key, &self.new_key);
            fs::write(&path, updated).with_context(|| format!("write {}", path.display()))?;
            info!(file = %path.display(), count, "renamed theme key");
            changed = true;
        }
        Ok(changed)
    }
}
