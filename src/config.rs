//! Configuration for the patch engine
//!
//! Describes the known structural versions of every class, the per-context
//! link tables, and creators that can be declared as plain data.
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (atom-patch.toml)
//! - A directory of TOML/JSON fragments, merged
//! - Environment variables (ATOM_PATCH__*)
//!
//! ## Example config file (atom-patch.toml):
//! ```toml
//! [engine]
//! duplicate_policy = "reject"
//! default_context = "MedicalData"
//!
//! [[classes]]
//! classname = "Widget"
//! versions = ["1", "2", "3"]
//!
//! [[contexts]]
//! name = "MedicalData"
//!
//! [[contexts.versions]]
//! name = "V1"
//! classes = [{ classname = "Widget", version = "1" }]
//!
//! [[contexts.renames]]
//! from = { classname = "Patient", version = "1" }
//! to = { classname = "MedPatient", version = "1" }
//!
//! [[creators]]
//! classname = "Widget"
//! version = "2"
//! attributes = { color = "white" }
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

use crate::atom::Atom;
use crate::error::{PatchError, Result};
use crate::version::VersionId;

/// Main configuration for the patch engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine settings
    #[serde(default)]
    pub engine: EngineSettings,

    /// Known classes and their ordered structural versions
    #[serde(default)]
    pub classes: Vec<ClassVersions>,

    /// Context link tables
    #[serde(default)]
    pub contexts: Vec<ContextConfig>,

    /// Creators declared as data
    #[serde(default)]
    pub creators: Vec<CreatorConfig>,
}

/// Engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// What to do when a creator or patch key is registered twice; unset
    /// means [`DuplicatePolicy::Reject`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_policy: Option<DuplicatePolicy>,

    /// Context used for semantic patches when the root atom names none
    #[serde(default)]
    pub default_context: Option<String>,
}

impl EngineSettings {
    /// Effective duplicate policy
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy.unwrap_or_default()
    }
}

/// Registration policy for an already registered key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail with [`PatchError::DuplicateRegistration`]
    #[default]
    Reject,
    /// Last registration wins
    Replace,
}

/// Ordered structural versions of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassVersions {
    pub classname: String,
    /// Oldest first; consecutive entries are linked by an edge
    pub versions: Vec<String>,
}

/// A named context and its link table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub name: String,

    /// Context versions, oldest first
    #[serde(default)]
    pub versions: Vec<ContextVersionConfig>,

    /// Classname-changing links between structural versions
    #[serde(default)]
    pub renames: Vec<RenameLink>,
}

/// One context version: the structural version of each class it uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextVersionConfig {
    pub name: String,

    /// Structural version of each class, one entry per classname
    #[serde(default)]
    pub classes: Vec<VersionId>,
}

/// A rename edge between two structural versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameLink {
    pub from: VersionId,
    pub to: VersionId,
}

/// A creator declared as data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorConfig {
    pub classname: String,
    pub version: String,

    /// Default attribute values
    #[serde(default)]
    pub attributes: BTreeMap<String, DefaultValue>,
}

/// A scalar or container default for a configured creator attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Boolean(bool),
    Numeric(f64),
    String(String),
    Sequence(Vec<DefaultValue>),
    Map(BTreeMap<String, DefaultValue>),
}

impl DefaultValue {
    /// Convert to an atom value
    pub fn to_atom(&self) -> Atom {
        match self {
            DefaultValue::Boolean(b) => Atom::Boolean(*b),
            DefaultValue::Numeric(n) => Atom::Numeric(*n),
            DefaultValue::String(s) => Atom::String(s.clone()),
            DefaultValue::Sequence(items) => Atom::Sequence(items.iter().map(|i| i.to_atom()).collect()),
            DefaultValue::Map(entries) => Atom::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_atom()))
                    .collect(),
            ),
        }
    }
}

impl EngineConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "atom-patch.toml",
            ".atom-patch.toml",
            "config/atom-patch.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "atom-patch") {
            let xdg_config = config_dir.config_dir().join("atom-patch.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (ATOM_PATCH__ENGINE__DUPLICATE_POLICY=replace)
        builder = builder.add_source(
            Environment::with_prefix("ATOM_PATCH")
                .separator("__")
                .try_parsing(true)
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load and merge every `.toml` / `.json` fragment found under `dir`.
    ///
    /// Files are visited in sorted path order so the merge is deterministic.
    pub fn load_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(PatchError::InvalidConfig(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut merged = EngineConfig::default();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_fragment = path
                .extension()
                .map(|ext| ext == "toml" || ext == "json")
                .unwrap_or(false);
            if !is_fragment {
                continue;
            }

            tracing::debug!(path = %path.display(), "loading version fragment");
            let content = std::fs::read_to_string(path)?;
            let fragment = if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                serde_json::from_str(&content).map_err(|e| {
                    PatchError::InvalidConfig(format!("{}: {}", path.display(), e))
                })?
            } else {
                toml::from_str(&content).map_err(|e| {
                    PatchError::InvalidConfig(format!("{}: {}", path.display(), e))
                })?
            };
            merged.merge(fragment);
        }

        Ok(merged)
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PatchError::InvalidConfig(e.to_string()))
    }

    /// Render as a TOML document
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PatchError::InvalidConfig(e.to_string()))
    }

    /// Merge another fragment into this one.
    ///
    /// Classes and creators are appended. Contexts with the same name have
    /// their versions and renames appended. Settings from `other` win when set.
    pub fn merge(&mut self, other: EngineConfig) {
        if other.engine.duplicate_policy.is_some() {
            self.engine.duplicate_policy = other.engine.duplicate_policy;
        }
        if other.engine.default_context.is_some() {
            self.engine.default_context = other.engine.default_context;
        }

        self.classes.extend(other.classes);
        self.creators.extend(other.creators);

        for context in other.contexts {
            match self.contexts.iter_mut().find(|c| c.name == context.name) {
                Some(existing) => {
                    existing.versions.extend(context.versions);
                    existing.renames.extend(context.renames);
                }
                None => self.contexts.push(context),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[engine]
duplicate_policy = "replace"
default_context = "MedicalData"

[[classes]]
classname = "Widget"
versions = ["1", "2"]

[[contexts]]
name = "MedicalData"

[[contexts.versions]]
name = "V1"
classes = [{ classname = "Widget", version = "1" }]

[[contexts.renames]]
from = { classname = "Patient", version = "1" }
to = { classname = "MedPatient", version = "1" }

[[creators]]
classname = "Widget"
version = "2"
attributes = { color = "white", size = 3.0, tags = ["a"] }
"#;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.engine.duplicate_policy(), DuplicatePolicy::Reject);
        assert!(config.classes.is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let config = EngineConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.engine.duplicate_policy(), DuplicatePolicy::Replace);
        assert_eq!(config.classes[0].versions, vec!["1", "2"]);
        assert_eq!(config.contexts[0].versions[0].classes[0], VersionId::new("Widget", "1"));
        assert_eq!(config.contexts[0].renames[0].to, VersionId::new("MedPatient", "1"));

        let attributes = &config.creators[0].attributes;
        assert_eq!(attributes["color"].to_atom(), Atom::string("white"));
        assert_eq!(attributes["size"].to_atom(), Atom::Numeric(3.0));
        assert_eq!(
            attributes["tags"].to_atom(),
            Atom::Sequence(vec![Atom::string("a")])
        );
    }

    #[test]
    fn test_serialize_config() {
        let config = EngineConfig::from_toml_str(SAMPLE).unwrap();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[[classes]]"));
    }

    #[test]
    fn test_merge_contexts_by_name() {
        let mut base = EngineConfig::from_toml_str(SAMPLE).unwrap();
        let other = EngineConfig::from_toml_str(
            r#"
[[contexts]]
name = "MedicalData"

[[contexts.versions]]
name = "V2"
classes = [{ classname = "Widget", version = "2" }]

[[contexts]]
name = "Other"
"#,
        )
        .unwrap();

        base.merge(other);
        assert_eq!(base.contexts.len(), 2);
        assert_eq!(base.contexts[0].versions.len(), 2);
        assert_eq!(base.engine.duplicate_policy(), DuplicatePolicy::Replace);
    }

    #[test]
    fn test_merge_explicit_reject_overrides_replace() {
        let mut base = EngineConfig::from_toml_str(SAMPLE).unwrap();
        base.merge(EngineConfig::from_toml_str("[engine]\n").unwrap());
        assert_eq!(base.engine.duplicate_policy(), DuplicatePolicy::Replace);

        let strict = EngineConfig::from_toml_str("[engine]\nduplicate_policy = \"reject\"\n").unwrap();
        assert_eq!(strict.engine.duplicate_policy, Some(DuplicatePolicy::Reject));
        base.merge(strict);
        assert_eq!(base.engine.duplicate_policy(), DuplicatePolicy::Reject);
    }
}
