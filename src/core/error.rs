//! Error taxonomy for weft operations.
//!
//! Every failure surfaced by the loader, resolver, composer, or provider
//! boundary is a [`WeftError`] variant carrying the structured fields a
//! caller needs to act on it (offending file, prop name, dependency chain,
//! and so on). Variants are grouped into coarse [`ErrorKind`] categories so
//! hosts can branch on the class of failure without matching every variant.
//!
//! [`ErrorContext`] wraps an error with a human-oriented context line, a
//! mitigation hint, an optional source location, and optional structured
//! data; [`WeftError::diagnose`] produces one per variant. All weft errors
//! are fatal to the operation that raised them.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::UnitKind;

/// Convenience result type used throughout the crate.
pub type Result<T> = std::result::Result<T, WeftError>;

/// All errors the weft core can raise.
///
/// Struct variants keep the machine-readable fields separate from the
/// rendered message so hosts can match on them programmatically.
#[derive(Debug, Error)]
pub enum WeftError {
    // -- validation -------------------------------------------------------

    /// The given path cannot identify a unit file (missing, unreadable, or
    /// carrying neither recognized suffix).
    #[error("Invalid unit path '{}': {reason}", path.display())]
    InvalidPath {
        /// Path as supplied by the caller.
        path: PathBuf,
        /// Why the path was rejected.
        reason: String,
    },

    /// The file exists but is not well-formed TOML.
    #[error("TOML syntax error in '{}': {reason}", file.display())]
    TomlSyntax {
        /// File that failed to parse.
        file: PathBuf,
        /// Parser message, including position details when available.
        reason: String,
        /// 1-based line of the first offending character, when known.
        line: Option<usize>,
        /// 1-based column of the first offending character, when known.
        column: Option<usize>,
    },

    /// The file is valid TOML but does not match the unit schema.
    #[error("Schema violation in '{}': {reason}", file.display())]
    Schema {
        /// File whose structure was rejected.
        file: PathBuf,
        /// Deserializer or structural-validation message.
        reason: String,
    },

    /// A kind-specific entry point was handed a unit of the other kind.
    #[error("'{}' is a {actual}, expected a {expected}", path.display())]
    UnexpectedUnitKind {
        /// Path of the offending unit file.
        path: PathBuf,
        /// Kind the caller demanded.
        expected: UnitKind,
        /// Kind the suffix actually denotes.
        actual: UnitKind,
    },

    /// A required prop was not supplied at an invocation site.
    #[error("Required prop '{prop}' is missing")]
    RequiredPropMissing {
        /// Name of the missing prop.
        prop: String,
        /// Component whose contract was violated.
        component: String,
    },

    /// A supplied prop value does not match the declared type.
    #[error("Prop '{prop}' should be of type '{expected}' but got '{actual}'")]
    PropTypeMismatch {
        /// Name of the offending prop.
        prop: String,
        /// Type declared in the component's contract.
        expected: String,
        /// Runtime type of the supplied value.
        actual: String,
        /// Component whose contract was violated.
        component: String,
    },

    // -- dependency -------------------------------------------------------

    /// The dependency graph contains a cycle.
    #[error("Circular dependency detected: {} (entry: {})", chain.join(" -> "), entry.display())]
    CircularDependency {
        /// Unit names along the cycle, first node repeated at the end.
        chain: Vec<String>,
        /// Entry file whose resolution uncovered the cycle.
        entry: PathBuf,
    },

    /// A declared dependency path does not exist or fails to load.
    #[error("Dependency '{alias}' of '{unit}' failed to load: {reason} (entry: {})", entry.display())]
    MissingDependency {
        /// Unit that declares the dependency.
        unit: String,
        /// Alias under which the dependency was declared.
        alias: String,
        /// Why the target could not be loaded.
        reason: String,
        /// Entry file whose resolution failed.
        entry: PathBuf,
    },

    /// A dependency declaration is structurally invalid (bad alias, wrong
    /// suffix, or a workflow used as a dependency target).
    #[error("Invalid dependency '{alias}' in '{unit}': {reason}")]
    InvalidDependencyReference {
        /// Unit that declares the dependency.
        unit: String,
        /// Offending alias.
        alias: String,
        /// What makes the declaration invalid.
        reason: String,
    },

    /// A template invoked an alias absent from the unit's dependency map.
    #[error("Component '{alias}' is not defined in the uses section of '{unit}'{}",
            suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
    AliasNotDeclared {
        /// Alias the template invoked.
        alias: String,
        /// Unit whose template made the call.
        unit: String,
        /// Closest declared alias, when one is plausible.
        suggestion: Option<String>,
    },

    /// An invoked alias resolved to a path with no node in the loaded graph.
    #[error("Component for alias '{alias}' in '{unit}' is not present in the dependency graph")]
    ComponentNotInGraph {
        /// Alias whose target is missing.
        alias: String,
        /// Unit whose template made the call.
        unit: String,
    },

    /// A render was requested before any dependency graph was loaded.
    #[error("No dependency graph loaded - resolve an entry file and call load_graph first")]
    GraphNotLoaded,

    /// Reserved: two units demand incompatible versions of a dependency.
    /// Versions are opaque metadata today, so the core never raises this.
    #[error("Version conflict on '{unit}': requested '{requested}', found '{found}'")]
    VersionConflict {
        /// Unit whose version field conflicts.
        unit: String,
        /// Version requested by the dependent.
        requested: String,
        /// Version actually present.
        found: String,
    },

    /// Resolution failed for a reason not covered by a specific variant.
    #[error("Dependency resolution failed: {reason}")]
    ResolutionFailed {
        /// Human-readable explanation.
        reason: String,
    },

    // -- provider ---------------------------------------------------------

    /// An `instruct` call named a provider nobody registered.
    #[error("Provider '{name}' is not registered")]
    ProviderNotFound {
        /// Requested provider name.
        name: String,
    },

    /// A provider invocation carried malformed arguments.
    #[error("Invalid arguments for provider '{name}': {reason}")]
    ProviderInvalidArguments {
        /// Provider whose arguments were rejected.
        name: String,
        /// What was wrong with them.
        reason: String,
    },

    /// A provider was found and called but failed to produce output.
    #[error("Provider '{name}' failed: {reason}")]
    ProviderExecutionFailed {
        /// Provider that failed.
        name: String,
        /// Failure detail reported by the provider.
        reason: String,
    },

    // -- template ---------------------------------------------------------

    /// The template engine rejected a unit's template body.
    #[error("Failed rendering {kind} '{unit}': {reason}")]
    TemplateRender {
        /// Name of the unit whose template failed.
        unit: String,
        /// Kind of the unit ("component" or "workflow").
        kind: String,
        /// Translated engine message.
        reason: String,
    },

    // -- internal ---------------------------------------------------------

    /// Filesystem operation failed.
    #[error("File system error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML deserialization failed outside the loader's staged validation.
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Catch-all for errors crossing a boundary that strips their type.
    #[error("{message}")]
    Other {
        /// Description of the failure.
        message: String,
    },
}

/// Coarse classification of [`WeftError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Unit file failed loading or structural validation.
    Validation,
    /// Dependency graph construction or alias resolution failed.
    Dependency,
    /// Provider lookup or execution failed.
    Provider,
    /// Template body failed to render.
    Template,
    /// Infrastructure failure not attributable to unit content.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Dependency => "dependency",
            Self::Provider => "provider",
            Self::Template => "template",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Severity of a surfaced error. Every weft error aborts the operation
/// that raised it, so today there is a single level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The operation cannot continue.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fatal")
    }
}

/// Location in a unit file an error points at, when one is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File the error originates from.
    pub file: PathBuf,
    /// 1-based line, when the underlying parser reported one.
    pub line: Option<usize>,
    /// 1-based column, when the underlying parser reported one.
    pub column: Option<usize>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(f, "{}:{line}:{column}", self.file.display())
            }
            (Some(line), None) => write!(f, "{}:{line}", self.file.display()),
            _ => write!(f, "{}", self.file.display()),
        }
    }
}

impl WeftError {
    /// The coarse category this variant belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath { .. }
            | Self::TomlSyntax { .. }
            | Self::Schema { .. }
            | Self::UnexpectedUnitKind { .. }
            | Self::RequiredPropMissing { .. }
            | Self::PropTypeMismatch { .. } => ErrorKind::Validation,
            Self::CircularDependency { .. }
            | Self::MissingDependency { .. }
            | Self::InvalidDependencyReference { .. }
            | Self::AliasNotDeclared { .. }
            | Self::ComponentNotInGraph { .. }
            | Self::GraphNotLoaded
            | Self::VersionConflict { .. }
            | Self::ResolutionFailed { .. } => ErrorKind::Dependency,
            Self::ProviderNotFound { .. }
            | Self::ProviderInvalidArguments { .. }
            | Self::ProviderExecutionFailed { .. } => ErrorKind::Provider,
            Self::TemplateRender { .. } => ErrorKind::Template,
            Self::IoError(_) | Self::TomlError(_) | Self::Other { .. } => ErrorKind::Internal,
        }
    }

    /// Severity of this error. Always [`Severity::Fatal`].
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }

    /// Rewrite the entry attribution of resolution errors.
    ///
    /// Dependency failures discovered while expanding a transitive unit are
    /// reported against the entry file the caller actually resolved, not the
    /// intermediate file the loader happened to be reading.
    pub fn attributed_to(self, entry: &std::path::Path) -> Self {
        match self {
            Self::CircularDependency { chain, .. } => Self::CircularDependency {
                chain,
                entry: entry.to_path_buf(),
            },
            Self::MissingDependency {
                unit,
                alias,
                reason,
                ..
            } => Self::MissingDependency {
                unit,
                alias,
                reason,
                entry: entry.to_path_buf(),
            },
            other => other,
        }
    }

    /// Wrap this error with per-variant context, mitigation, and location.
    pub fn diagnose(self) -> ErrorContext {
        let (context, mitigation, location) = match &self {
            Self::InvalidPath { path, .. } => (
                "loading a unit file",
                format!(
                    "Check that the path exists and ends with '{}' or '{}'",
                    UnitKind::COMPONENT_SUFFIX,
                    UnitKind::WORKFLOW_SUFFIX
                ),
                Some(SourceLocation {
                    file: path.clone(),
                    line: None,
                    column: None,
                }),
            ),
            Self::TomlSyntax {
                file, line, column, ..
            } => (
                "parsing a unit file",
                "Fix the TOML syntax at the reported position".to_string(),
                Some(SourceLocation {
                    file: file.clone(),
                    line: *line,
                    column: *column,
                }),
            ),
            Self::Schema { file, .. } => (
                "validating a unit file against the schema",
                "Check the [component]/[workflow], [props], [uses], and [template] sections"
                    .to_string(),
                Some(SourceLocation {
                    file: file.clone(),
                    line: None,
                    column: None,
                }),
            ),
            Self::UnexpectedUnitKind { path, expected, .. } => (
                "dispatching a unit file by suffix",
                format!("Pass a '*{}' file to this entry point", expected.suffix()),
                Some(SourceLocation {
                    file: path.clone(),
                    line: None,
                    column: None,
                }),
            ),
            Self::RequiredPropMissing { prop, component } => (
                "validating props at an invocation site",
                format!("Pass '{prop}' when invoking component '{component}'"),
                None,
            ),
            Self::PropTypeMismatch {
                prop,
                expected,
                component,
                ..
            } => (
                "validating props at an invocation site",
                format!("Pass a {expected} value for '{prop}' of component '{component}'"),
                None,
            ),
            Self::CircularDependency { entry, .. } => (
                "building the dependency graph",
                "Break the cycle by removing one of the uses entries along the chain".to_string(),
                Some(SourceLocation {
                    file: entry.clone(),
                    line: None,
                    column: None,
                }),
            ),
            Self::MissingDependency {
                unit, alias, entry, ..
            } => (
                "building the dependency graph",
                format!("Fix the '{alias}' path in the uses section of '{unit}'"),
                Some(SourceLocation {
                    file: entry.clone(),
                    line: None,
                    column: None,
                }),
            ),
            Self::InvalidDependencyReference { unit, alias, .. } => (
                "validating dependency declarations",
                format!("Correct the '{alias}' entry in the uses section of '{unit}'"),
                None,
            ),
            Self::AliasNotDeclared { alias, unit, .. } => (
                "invoking a dependency from a template",
                format!("Declare '{alias}' in the uses section of '{unit}' before calling it"),
                None,
            ),
            Self::ComponentNotInGraph { alias, .. } => (
                "invoking a dependency from a template",
                format!("Re-resolve the entry file so '{alias}' is part of the loaded graph"),
                None,
            ),
            Self::GraphNotLoaded => (
                "rendering a unit",
                "Resolve an entry file and pass the result to load_graph before rendering"
                    .to_string(),
                None,
            ),
            Self::VersionConflict { unit, .. } => (
                "resolving unit versions",
                format!("Align the version requirements on '{unit}'"),
                None,
            ),
            Self::ResolutionFailed { .. } => (
                "resolving the dependency graph",
                "Check the uses declarations of the entry file and its dependencies".to_string(),
                None,
            ),
            Self::ProviderNotFound { name } => (
                "dispatching an instruct call",
                format!("Register a provider named '{name}' before rendering"),
                None,
            ),
            Self::ProviderInvalidArguments { name, .. } => (
                "dispatching an instruct call",
                format!("Check the arguments passed to provider '{name}'"),
                None,
            ),
            Self::ProviderExecutionFailed { name, .. } => (
                "executing a provider",
                format!("Inspect provider '{name}' for the underlying failure"),
                None,
            ),
            Self::TemplateRender { unit, kind, .. } => (
                "rendering a template",
                format!("Check the [template] section of {kind} '{unit}' for syntax errors"),
                None,
            ),
            Self::IoError(_) => (
                "accessing the file system",
                "Check that the file exists and is readable".to_string(),
                None,
            ),
            Self::TomlError(_) => (
                "parsing TOML content",
                "Fix the reported TOML syntax error".to_string(),
                None,
            ),
            Self::Other { .. } => (
                "performing a weft operation",
                "Inspect the error message for details".to_string(),
                None,
            ),
        };

        let data = match &self {
            Self::RequiredPropMissing { prop, component } => Some(serde_json::json!({
                "prop": prop,
                "component": component,
            })),
            Self::PropTypeMismatch {
                prop,
                expected,
                actual,
                component,
            } => Some(serde_json::json!({
                "prop": prop,
                "expected": expected,
                "actual": actual,
                "component": component,
            })),
            Self::CircularDependency { chain, .. } => Some(serde_json::json!({
                "chain": chain,
            })),
            Self::AliasNotDeclared {
                alias,
                unit,
                suggestion,
            } => Some(serde_json::json!({
                "alias": alias,
                "unit": unit,
                "suggestion": suggestion,
            })),
            Self::MissingDependency { unit, alias, .. } => Some(serde_json::json!({
                "unit": unit,
                "alias": alias,
            })),
            _ => None,
        };

        ErrorContext {
            error: self,
            context: Some(context.to_string()),
            mitigation: Some(mitigation),
            location,
            data,
        }
    }
}

/// An error paired with presentation-oriented context.
///
/// Produced by [`WeftError::diagnose`] or assembled by hand at a host
/// boundary. `display()` renders a colored, multi-line report.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error.
    pub error: WeftError,
    /// What the core was doing when the error was raised.
    pub context: Option<String>,
    /// Actionable hint for resolving the error.
    pub mitigation: Option<String>,
    /// Source location the error points at, when known.
    pub location: Option<SourceLocation>,
    /// Structured payload for host tooling.
    pub data: Option<serde_json::Value>,
}

impl ErrorContext {
    /// Wrap an error with no additional context.
    pub fn new(error: WeftError) -> Self {
        Self {
            error,
            context: None,
            mitigation: None,
            location: None,
            data: None,
        }
    }

    /// Set the operation context line.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the mitigation hint.
    #[must_use]
    pub fn with_mitigation(mut self, mitigation: impl Into<String>) -> Self {
        self.mitigation = Some(mitigation.into());
        self
    }

    /// Set the source location.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach a structured data payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Render a colored multi-line report to stderr-friendly text.
    pub fn display(&self) -> String {
        let mut out = format!(
            "{} {}",
            format!("[{}]", self.error.kind()).red().bold(),
            self.error
        );
        if let Some(location) = &self.location {
            out.push_str(&format!("\n  {} {}", "at:".dimmed(), location));
        }
        if let Some(context) = &self.context {
            out.push_str(&format!("\n  {} {}", "while:".dimmed(), context));
        }
        if let Some(mitigation) = &self.mitigation {
            out.push_str(&format!("\n  {} {}", "help:".yellow(), mitigation));
        }
        out
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(context) = &self.context {
            write!(f, " (while {context})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorContext {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Convert an [`anyhow::Error`] arriving from a host boundary back into a
/// diagnosed [`ErrorContext`], preserving the typed variant when the chain
/// contains one.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    match error.downcast::<WeftError>() {
        Ok(weft) => weft.diagnose(),
        Err(other) => WeftError::Other {
            message: format!("{other:#}"),
        }
        .diagnose(),
    }
}
