//! Serialized form of sequence definitions.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Formats a definition source may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    /// `.json`
    Json,
    /// `.yaml` or `.yml`
    Yaml,
    /// `.toml`
    Toml,
    /// `.xml`, rooted at a `<sequence>` element
    Xml,
}

impl DefinitionFormat {
    /// Picks the format from a file extension; `None` for anything else.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

/// One sequence as written in a definition source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceDefinition {
    /// Sequence name; defaults to the source's identifier.
    #[serde(default)]
    pub name: Option<String>,
    /// Top-level mediators in execution order.
    #[serde(default)]
    pub mediators: Vec<MediatorDefinition>,
}

/// A mediator entry: a single-key map whose key is the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediatorDefinition {
    /// `{"log": {...}}`
    Log(LogDefinition),
    /// `{"filter": {...}}`
    Filter(FilterDefinition),
    /// `{"send": {...}}`
    Send(SendDefinition),
}

/// Attributes of a `log` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogDefinition {
    /// Level name; unknown names log at INFO.
    #[serde(default)]
    pub level: Option<String>,
    /// Fixed message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Attributes of a `filter` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterDefinition {
    /// Predicate source.
    pub expr: String,
    /// Nested mediators run when the predicate holds.
    #[serde(default)]
    pub mediators: Vec<MediatorDefinition>,
}

/// Attributes of a `send` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendDefinition {
    /// Absolute destination URL.
    #[serde(alias = "destination")]
    pub url: String,
}

impl SequenceDefinition {
    /// Parses a definition document.
    ///
    /// `source_id` only labels errors.
    pub fn parse(raw: &str, format: DefinitionFormat, source_id: &str) -> Result<Self, ConfigError> {
        let parsed = match format {
            DefinitionFormat::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
            DefinitionFormat::Yaml => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
            DefinitionFormat::Toml => toml::from_str(raw).map_err(|e| e.to_string()),
            DefinitionFormat::Xml => return super::xml::parse(raw, source_id),
        };
        parsed.map_err(|message| ConfigError::new(source_id, message))
    }
}
