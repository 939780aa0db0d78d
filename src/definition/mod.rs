//! Unit definition types parsed from `*.component.toml` and
//! `*.workflow.toml` files.
//!
//! A component carries metadata, an optional typed property contract, a
//! dependency map (alias -> relative path), a template body, and opaque
//! per-target configuration. A workflow is the top-level aggregator shape:
//! metadata, dependency map, and template body, with no prop contract of its
//! own. [`Definition`] is the tagged union the rest of the crate passes
//! around behind an `Arc`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::UnitKind;

pub(crate) mod loader;

pub use loader::Loader;

/// Shared metadata block of a unit (`[component]` or `[workflow]` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMetadata {
    /// Unit name. Must be non-empty; uniqueness is not required because
    /// units are addressed by path, not by name.
    pub name: String,

    /// Human-readable description of what the unit produces.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Opaque version string. Surfaced as metadata, never solved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Declared type of a component prop.
///
/// Serialized as the bare lowercase type name. Unknown names are preserved
/// as [`PropType::Other`] and skipped during type checking rather than
/// rejected, so contracts can carry forward-compatible annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropType {
    String,
    Number,
    Boolean,
    Array,
    Other(String),
}

impl PropType {
    /// The lowercase name used in unit files and error messages.
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PropType {
    fn from(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for PropType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name.as_str()))
    }
}

/// One entry of a component's property contract (`[props.<name>]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropSpec {
    /// Declared value type.
    #[serde(rename = "type")]
    pub prop_type: PropType,

    /// What the prop controls.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Whether every invocation site must supply the prop.
    #[serde(default)]
    pub required: bool,

    /// Value substituted when an optional prop is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<toml::Value>,
}

impl PropSpec {
    /// The default value converted to JSON, when one is declared.
    pub fn default_json(&self) -> Option<serde_json::Value> {
        self.default.as_ref().map(toml_value_to_json)
    }
}

/// The `[template]` table of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSection {
    /// Raw template body, evaluated by the composition engine.
    pub content: String,
}

/// A parsed `*.component.toml` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDefinition {
    /// The `[component]` metadata table.
    #[serde(rename = "component")]
    pub metadata: UnitMetadata,

    /// Property contract, keyed by prop name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, PropSpec>,

    /// Dependency map: alias -> path relative to this file's directory.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub uses: BTreeMap<String, String>,

    /// Template body.
    pub template: TemplateSection,

    /// Per-target configuration tables, carried opaquely for downstream
    /// target processors. The core never interprets them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, toml::Value>,

    /// Canonical path of the file this definition was parsed from.
    /// Populated by the loader, never serialized.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// A parsed `*.workflow.toml` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// The `[workflow]` metadata table.
    #[serde(rename = "workflow")]
    pub metadata: UnitMetadata,

    /// Dependency map: alias -> path relative to this file's directory.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub uses: BTreeMap<String, String>,

    /// Template body.
    pub template: TemplateSection,

    /// Canonical path of the file this definition was parsed from.
    /// Populated by the loader, never serialized.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// A loaded unit of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Component(ComponentDefinition),
    Workflow(WorkflowDefinition),
}

impl Definition {
    /// Kind of this unit.
    pub fn kind(&self) -> UnitKind {
        match self {
            Self::Component(_) => UnitKind::Component,
            Self::Workflow(_) => UnitKind::Workflow,
        }
    }

    /// Metadata block of either kind.
    pub fn metadata(&self) -> &UnitMetadata {
        match self {
            Self::Component(c) => &c.metadata,
            Self::Workflow(w) => &w.metadata,
        }
    }

    /// Unit name from the metadata block.
    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Dependency map of either kind.
    pub fn uses(&self) -> &BTreeMap<String, String> {
        match self {
            Self::Component(c) => &c.uses,
            Self::Workflow(w) => &w.uses,
        }
    }

    /// Template body of either kind.
    pub fn template_content(&self) -> &str {
        match self {
            Self::Component(c) => &c.template.content,
            Self::Workflow(w) => &w.template.content,
        }
    }

    /// Canonical source file path, set by the loader.
    pub fn source_path(&self) -> Option<&Path> {
        match self {
            Self::Component(c) => c.source_path.as_deref(),
            Self::Workflow(w) => w.source_path.as_deref(),
        }
    }

    /// Directory containing the source file, for resolving relative
    /// dependency paths.
    pub fn source_dir(&self) -> Option<&Path> {
        self.source_path().and_then(Path::parent)
    }

    /// The component view, when this unit is one.
    pub fn as_component(&self) -> Option<&ComponentDefinition> {
        match self {
            Self::Component(c) => Some(c),
            Self::Workflow(_) => None,
        }
    }
}

/// Convert a TOML value into the equivalent JSON value.
///
/// Prop defaults are declared in TOML but flow into JSON render contexts.
/// Datetimes become their string representation.
pub(crate) fn toml_value_to_json(value: &toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s.clone()),
        toml::Value::Integer(i) => serde_json::Value::Number((*i).into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        toml::Value::Boolean(b) => serde_json::Value::Bool(*b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(toml_value_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_value_to_json(v)))
                .collect(),
        ),
    }
}
