//! Extension manifest formats and the JSON to TOML port.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::slug::slugify;
use crate::core::version::bump_patch;

/// On-disk manifest encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Toml,
}

impl ManifestFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

/// Legacy JSON manifest. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LegacyManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub repository: Option<String>,
}

/// Canonical TOML manifest as written by the port.
///
/// Field order is the serialized key order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtensionManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub schema_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar: Option<String>,
}

/// Companion grammar config embedded as `[grammars.<id>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarConfig {
    pub id: String,
    /// Verbatim file content placed under the section header.
    pub content: String,
}

/// Convert a legacy JSON manifest into the canonical TOML document.
///
/// The id is the kebab-case form of the display name and the version's patch
/// component is bumped. A grammar config, when present, becomes a top-level
/// `grammar` key plus an appended `[grammars.<id>]` section.
pub fn port_manifest(
    legacy_json: &str,
    grammar: Option<&GrammarConfig>,
    schema_version: u32,
) -> Result<String> {
    let legacy: LegacyManifest =
        serde_json::from_str(legacy_json).context("parse legacy manifest json")?;
    let id = slugify(&legacy.name);
    if id.is_empty() {
        bail!("cannot derive an id from name '{}'", legacy.name);
    }
    let version = bump_patch(&legacy.version).context("bump manifest version")?;

    let manifest = ExtensionManifest {
        id,
        name: legacy.name,
        version,
        schema_version,
        description: legacy.description,
        authors: legacy.authors,
        repository: legacy.repository,
        grammar: grammar.map(|g| g.id.clone()),
    };
    let mut out = toml::to_string(&manifest).context("serialize manifest toml")?;

    if let Some(grammar) = grammar {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("\n[grammars.{}]\n", toml_key(&grammar.id)));
        out.push_str(&grammar.content);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    Ok(out)
}

/// Render `key` as a TOML key: bare when it only uses `A-Za-z0-9_-`, quoted otherwise.
fn toml_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        return key.to_string();
    }
    let mut quoted = String::with_capacity(key.len() + 2);
    quoted.push('"');
    for c in key.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04X}", u32::from(c))),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
