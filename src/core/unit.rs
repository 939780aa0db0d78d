//! Unit kind discrimination for weft source files.
//!
//! Weft recognizes exactly two kinds of unit files, distinguished purely by
//! filename suffix: `*.component.toml` and `*.workflow.toml`. Any other
//! suffix is rejected before parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The two kinds of template units weft can load.
///
/// Components are reusable building blocks with an optional typed property
/// contract; Workflows are top-level aggregators that may only ever appear as
/// graph roots, never as dependency targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// A reusable component (`*.component.toml`).
    Component,
    /// A top-level workflow (`*.workflow.toml`).
    Workflow,
}

impl UnitKind {
    /// Filename suffix denoting a component unit.
    pub const COMPONENT_SUFFIX: &'static str = ".component.toml";

    /// Filename suffix denoting a workflow unit.
    pub const WORKFLOW_SUFFIX: &'static str = ".workflow.toml";

    /// Determine the unit kind from a file path's name.
    ///
    /// Returns `None` for any filename that carries neither recognized
    /// suffix. Kind detection never touches the filesystem.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(Self::COMPONENT_SUFFIX) {
            Some(Self::Component)
        } else if name.ends_with(Self::WORKFLOW_SUFFIX) {
            Some(Self::Workflow)
        } else {
            None
        }
    }

    /// Lowercase human-readable name of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Workflow => "workflow",
        }
    }

    /// The filename suffix for this kind.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Component => Self::COMPONENT_SUFFIX,
            Self::Workflow => Self::WORKFLOW_SUFFIX,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
