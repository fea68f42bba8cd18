//! Bot configuration stored in `patchbot.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::process::ProcessLimits;

pub const DEFAULT_CONFIG_PATH: &str = "patchbot.toml";

/// Bot configuration (TOML).
///
/// Missing fields fall back to the defaults below, so a config file only has
/// to name what differs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BotConfig {
    /// Account that owns the forks and authors the pull requests.
    pub bot_login: String,

    /// Tracking issue listing the repositories to patch.
    pub issue_url: String,

    /// Where the bot's own source lives; linked from every PR body.
    pub source_url: String,

    /// Scratch directory, wiped at the start of every run.
    pub work_dir: PathBuf,

    /// Name of the git remote pointing at the bot's fork.
    pub fork_remote: String,

    /// New branches are named `<branch_prefix>-<UTC timestamp>`.
    pub branch_prefix: String,

    pub commit_message: String,

    /// minijinja template; sees `repo`, `issue_url`, `source_url`, `patch`.
    pub pr_title: String,

    /// minijinja template; sees `repo`, `issue_url`, `source_url`, `patch`.
    pub pr_body: String,

    /// Per-command wall-clock limit for `git`/`gh` invocations.
    pub command_timeout_secs: u64,

    /// Truncate captured command output beyond this many bytes.
    pub output_limit_bytes: usize,

    pub rename: RenameConfig,

    pub port: PortConfig,
}

/// Settings for the theme attribute rename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenameConfig {
    /// Directory (relative to the repo root) holding theme files.
    pub dir: PathBuf,
    /// Theme file extension, without the dot.
    pub extension: String,
    /// Replaced verbatim wherever it appears.
    pub old_key: String,
    pub new_key: String,
}

/// Settings for the JSON to TOML manifest port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PortConfig {
    pub legacy_file: PathBuf,
    pub manifest_file: PathBuf,
    /// Directory searched for a companion grammar `.toml`.
    pub grammars_dir: PathBuf,
    pub schema_version: u32,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("themes"),
            extension: "json".to_string(),
            old_key: "\"scrollbar_thumb.background\"".to_string(),
            new_key: "\"scrollbar.thumb.background\"".to_string(),
        }
    }
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            legacy_file: PathBuf::from("extension.json"),
            manifest_file: PathBuf::from("extension.toml"),
            grammars_dir: PathBuf::from("grammars"),
            schema_version: 1,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_login: "patchbot".to_string(),
            issue_url: String::new(),
            source_url: String::new(),
            work_dir: PathBuf::from("work"),
            fork_remote: "fork".to_string(),
            branch_prefix: "patchbot".to_string(),
            commit_message: "Apply automated extension maintenance patch".to_string(),
            pr_title: "{{ patch }}".to_string(),
            pr_body: DEFAULT_PR_BODY.to_string(),
            command_timeout_secs: 10 * 60,
            output_limit_bytes: 1_000_000,
            rename: RenameConfig::default(),
            port: PortConfig::default(),
        }
    }
}

const DEFAULT_PR_BODY: &str = "\
This pull request was opened automatically for {{ repo }}.

Change: {{ patch }}.
{% if issue_url %}
Tracking issue: {{ issue_url }}
{% endif %}{% if source_url %}
This bot's source: {{ source_url }}
{% endif %}";

impl BotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bot_login.trim().is_empty() {
            return Err(anyhow!("bot_login must be non-empty"));
        }
        if self.fork_remote.trim().is_empty() {
            return Err(anyhow!("fork_remote must be non-empty"));
        }
        if self.branch_prefix.trim().is_empty() {
            return Err(anyhow!("branch_prefix must be non-empty"));
        }
        if self.commit_message.trim().is_empty() {
            return Err(anyhow!("commit_message must be non-empty"));
        }
        if self.pr_title.trim().is_empty() || self.pr_body.trim().is_empty() {
            return Err(anyhow!("pr_title and pr_body must be non-empty"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.rename.old_key.is_empty() {
            return Err(anyhow!("rename.old_key must be non-empty"));
        }
        if self.rename.new_key.contains(&self.rename.old_key) {
            return Err(anyhow!("rename.new_key must not contain rename.old_key"));
        }
        if self.port.legacy_file == self.port.manifest_file {
            return Err(anyhow!("port.legacy_file and port.manifest_file must differ"));
        }
        Ok(())
    }

    pub fn process_limits(&self) -> ProcessLimits {
        ProcessLimits {
            timeout: Duration::from_secs(self.command_timeout_secs),
            output_limit_bytes: self.output_limit_bytes,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BotConfig::default()`.
pub fn load_config(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        let cfg = BotConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BotConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &BotConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, BotConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("patchbot.toml");
        let cfg = BotConfig {
            bot_login: "theme-bot".to_string(),
            issue_url: "https://github.com/acme/zed/issues/1".to_string(),
            ..BotConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("patchbot.toml");
        fs::write(&path, "bot_login = \"theme-bot\"\n[rename]\ndir = \"assets\"\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.bot_login, "theme-bot");
        assert_eq!(cfg.rename.dir, PathBuf::from("assets"));
        assert_eq!(cfg.rename.extension, "json");
        assert_eq!(cfg.port, PortConfig::default());
    }

    #[test]
    fn rejects_non_idempotent_rename() {
        let cfg = BotConfig {
            rename: RenameConfig {
                old_key: "background".to_string(),
                new_key: "editor.background".to_string(),
                ..RenameConfig::default()
            },
            ..BotConfig::default()
        };
        let err = cfg.validate().expect_err("invalid");
        assert!(err.to_string().contains("must not contain"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let cfg = BotConfig {
            command_timeout_secs: 0,
            ..BotConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
