//! Port of the legacy JSON manifest to the TOML manifest.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument};

use crate::core::manifest::{GrammarConfig, port_manifest};
use crate::io::config::PortConfig;
use crate::io::workspace::RepoHandle;
use crate::patch::Patch;

/// Writes the TOML manifest from the legacy JSON one, then removes the legacy file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPort {
    legacy_file: PathBuf,
    manifest_file: PathBuf,
    grammars_dir: PathBuf,
    schema_version: u32,
}

impl ManifestPort {
    pub fn from_config(cfg: &PortConfig) -> Self {
        Self {
            legacy_file: cfg.legacy_file.clone(),
            manifest_file: cfg.manifest_file.clone(),
            grammars_dir: cfg.grammars_dir.clone(),
            schema_version: cfg.schema_version,
        }
    }

    /// First `.toml` file (by path) in the grammars directory, if any.
    pub fn find_grammar(&self, repo_root: &Path) -> Result<Option<GrammarConfig>> {
        let dir = repo_root.join(&self.grammars_dir);
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut candidates = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
            let path = entry
                .with_context(|| format!("read entry in {}", dir.display()))?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                candidates.push(path);
            }
        }
        candidates.sort();
        let Some(path) = candidates.into_iter().next() else {
            return Ok(None);
        };
        let id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let content =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        debug!(grammar = %id, "found grammar config");
        Ok(Some(GrammarConfig { id, content }))
    }
}

impl Patch for ManifestPort {
    fn name(&self) -> &'static str {
        "port"
    }

    fn describe(&self) -> String {
        format!(
            "Port {} to {}",
            self.legacy_file.display(),
            self.manifest_file.display()
        )
    }

    #[instrument(skip_all, fields(repo = %repo.repo()))]
    fn apply(&self, repo: &RepoHandle) -> Result<bool> {
        let target = repo.path(&self.manifest_file);
        if target.exists() {
            debug!(target = %target.display(), "manifest already ported");
            return Ok(false);
        }
        let legacy = repo.path(&self.legacy_file);
        if !legacy.exists() {
            bail!(
                "{} has neither {} nor {}",
                repo.repo(),
                self.manifest_file.display(),
                self.legacy_file.display()
            );
        }

        let legacy_json =
            fs::read_to_string(&legacy).with_context(|| format!("read {}", legacy.display()))?;
        let grammar = self.find_grammar(repo.root())?;
        let ported = port_manifest(&legacy_json, grammar.as_ref(), self.schema_version)
            .with_context(|| format!("port {}", legacy.display()))?;

        fs::write(&target, ported).with_context(|| format!("write {}", target.display()))?;
        fs::remove_file(&legacy).with_context(|| format!("remove {}", legacy.display()))?;
        info!(
            target = %target.display(),
            grammar = grammar.as_ref().map(|g| g.id.as_str()),
            "ported manifest"
        );
        Ok(true)
    }

    fn bumps_version(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RepoRef;

    const LEGACY: &str = r#"{"name": "My Cool Ext", "version": "1.0.0"}"#;

    fn setup(files: &[(&str, &str)]) -> (tempfile::TempDir, RepoHandle) {
        let temp = tempfile::tempdir().expect("tempdir");
        for (rel, contents) in files {
            let path = temp.path().join(rel);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(path, contents).expect("write");
        }
        let handle = RepoHandle::new(RepoRef::new("alice", "ext"), temp.path());
        (temp, handle)
    }

    fn patch() -> ManifestPort {
        ManifestPort::from_config(&PortConfig::default())
    }

    #[test]
    fn ports_without_grammar() {
        let (temp, repo) = setup(&[("extension.json", LEGACY)]);

        assert!(patch().apply(&repo).expect("apply"));
        let out = fs::read_to_string(temp.path().join("extension.toml")).expect("read");
        assert!(out.contains("id = \"my-cool-ext\""), "{out}");
        assert!(out.contains("version = \"1.0.1\""), "{out}");
        assert!(out.contains("schema_version = 1"), "{out}");
        assert!(!out.contains("grammar"), "{out}");
        assert!(!temp.path().join("extension.json").exists());
    }

    #[test]
    fn embeds_grammar_config() {
        let (temp, repo) = setup(&[
            ("extension.json", LEGACY),
            ("grammars/rust.toml", "path = \"grammars/rust\"\n"),
        ]);

        assert!(patch().apply(&repo).expect("apply"));
        let out = fs::read_to_string(temp.path().join("extension.toml")).expect("read");
        assert!(out.contains("grammar = \"rust\""), "{out}");
        assert!(
            out.contains("[grammars.rust]\npath = \"grammars/rust\"\n"),
            "{out}"
        );
    }

    #[test]
    fn dotted_grammar_file_becomes_one_quoted_table() {
        let (temp, repo) = setup(&[
            ("extension.json", LEGACY),
            ("grammars/tree.sitter.toml", "path = \"grammars/ts\"\n"),
        ]);

        assert!(patch().apply(&repo).expect("apply"));
        let out = fs::read_to_string(temp.path().join("extension.toml")).expect("read");
        assert!(out.contains("[grammars.\"tree.sitter\"]"), "{out}");
        let parsed: toml::Table = toml::from_str(&out).expect("valid toml");
        assert_eq!(
            parsed["grammars"]["tree.sitter"]["path"].as_str(),
            Some("grammars/ts")
        );
    }

    #[test]
    fn existing_target_is_a_noop() {
        let existing = "id = \"kept\"\nversion = \"0.0.1\"\n";
        let (temp, repo) = setup(&[
            ("extension.json", "this is not even json"),
            ("extension.toml", existing),
        ]);

        assert!(!patch().apply(&repo).expect("apply"));
        assert_eq!(
            fs::read_to_string(temp.path().join("extension.toml")).expect("read"),
            existing
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("extension.json")).expect("read"),
            "this is not even json"
        );
    }

    #[test]
    fn missing_both_manifests_is_an_error() {
        let (_temp, repo) = setup(&[("README.md", "hi")]);
        let err = patch().apply(&repo).expect_err("no manifest");
        assert!(err.to_string().contains("has neither"));
    }

    #[test]
    fn ignores_non_toml_grammar_files() {
        let (temp, _repo) = setup(&[("grammars/README.md", "docs")]);
        assert_eq!(patch().find_grammar(temp.path()).expect("find"), None);
    }
}
