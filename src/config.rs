//! Project configuration module.
//!
//! Handles loading, validating, and merging `hyde.toml`. Stock defaults are
//! overridden by the file at the source root (or the one passed with
//! `--config`). Config files are sparse: override just the values you want.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! name = "content"          # Context name; namespaces every identifier
//! mode = "markdown"         # markdown | content (adds .yml/.yaml data files)
//!
//! [serializer]
//! types = "fixed"           # fixed | declared (document `type` key wins)
//!
//! [serializer.item]
//! type_name = "hyde/items"
//! attributes = ["document", "body"]
//! relationships = ["parent", "tags"]
//! embed = []                # relationships also emitted under `included`
//!
//! [serializer.collection]
//! type_name = "hyde/collections"
//! attributes = ["document", "body"]
//! relationships = ["parent", "collections", "items"]
//! embed = []
//!
//! [output]
//! pretty = true             # Pretty-print written JSON
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::hierarchy::validate_identifier;
use crate::model::ModelKind;
use crate::parser::ParseMode;
use crate::serializer::{ATTRIBUTE_NAMES, SerializerConfig, Serializers};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the source root.
pub const CONFIG_FILENAME: &str = "hyde.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `hyde.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HydeConfig {
    /// Context name, used as the first segment of every derived identifier.
    pub name: String,
    /// Which extensions are parsed.
    pub mode: ParseMode,
    /// Per-kind JSON:API settings.
    pub serializer: Serializers,
    /// Written output settings.
    pub output: OutputConfig,
}

impl Default for HydeConfig {
    fn default() -> Self {
        Self {
            name: crate::context::DEFAULT_NAME.to_string(),
            mode: ParseMode::default(),
            serializer: Serializers::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Written output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl HydeConfig {
    /// Validate names and cross-references.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier(&self.name)
            .map_err(|e| ConfigError::Validation(format!("name: {e}")))?;
        validate_serializer("serializer.item", ModelKind::Item, &self.serializer.item)?;
        validate_serializer(
            "serializer.collection",
            ModelKind::Collection,
            &self.serializer.collection,
        )?;
        Ok(())
    }
}

fn validate_serializer(
    section: &str,
    kind: ModelKind,
    config: &SerializerConfig,
) -> Result<(), ConfigError> {
    if config.type_name.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{section}.type_name must not be empty"
        )));
    }
    if let Some(bad) = config
        .attributes
        .iter()
        .find(|a| !ATTRIBUTE_NAMES.contains(&a.as_str()))
    {
        return Err(ConfigError::Validation(format!(
            "{section}.attributes: unknown attribute '{bad}' (expected one of {})",
            ATTRIBUTE_NAMES.join(", ")
        )));
    }
    let known = SerializerConfig::known_relationships(kind);
    if let Some(bad) = config
        .relationships
        .iter()
        .find(|r| !known.contains(&r.as_str()))
    {
        return Err(ConfigError::Validation(format!(
            "{section}.relationships: '{bad}' is not a relationship of {kind}s (expected one of {})",
            known.join(", ")
        )));
    }
    if let Some(bad) = config
        .embed
        .iter()
        .find(|e| !config.relationships.contains(e))
    {
        return Err(ConfigError::Validation(format!(
            "{section}.embed: '{bad}' is not listed in relationships"
        )));
    }
    Ok(())
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock defaults as a TOML value, the base every overlay merges onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(HydeConfig::default()).expect("default config must serialize")
}

/// Deep-merge two TOML values. Tables merge key by key; anything else in
/// `overlay` replaces `base`.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `hyde.toml` from `root`, if present.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    read_raw_config(&config_path).map(Some)
}

fn read_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<HydeConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: HydeConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config for a source root: stock defaults plus `root/hyde.toml`.
pub fn load_config(root: &Path) -> Result<HydeConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(root)?)
}

/// Load the config from an explicit file, which must exist.
pub fn load_config_file(path: &Path) -> Result<HydeConfig, ConfigError> {
    resolve_config(stock_defaults_value(), Some(read_raw_config(path)?))
}

/// Documented stock `hyde.toml`, printed by `hyde gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Hyde Configuration
# ==================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as hyde.toml in the source root, or pass --config.
# Unknown keys will cause an error.

# Context name. Every identifier derived from a file path starts with it:
#   posts/hello.md -> content/posts/hello
# Tags resolve to collections under <name>/tags/.
name = "content"

# Which files are parsed:
#   markdown -> .md, .markdown, .mbs
#   content  -> markdown plus .yml, .yaml data files
mode = "markdown"

# ---------------------------------------------------------------------------
# JSON:API serialization
# ---------------------------------------------------------------------------
[serializer]
# How resource types are chosen:
#   fixed    -> by kind (type_name below)
#   declared -> the document's `type` key, falling back to type_name.
#               Document keys become attributes and a `relationships`
#               mapping links further entities by identifier.
types = "fixed"

[serializer.item]
type_name = "hyde/items"
# Any of: ext, document, body
attributes = ["document", "body"]
# Any of: parent, tags
relationships = ["parent", "tags"]
# Relationships whose targets are also written under `included`.
embed = []

[serializer.collection]
type_name = "hyde/collections"
# Placeholder collections have no content; these fill in when a file
# like posts.md merges into the posts/ collection.
attributes = ["document", "body"]
# Any of: parent, collections, items
relationships = ["parent", "collections", "items"]
embed = []

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Pretty-print the JSON files written by `hyde build`.
pretty = true
"##
}
