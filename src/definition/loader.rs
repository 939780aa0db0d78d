//! Staged loading and validation of unit files.
//!
//! Validation runs in a fixed order so callers get the most specific error
//! first: path/suffix dispatch, existence, UTF-8 decoding, TOML syntax,
//! schema deserialization, then structural checks (non-empty name, valid
//! aliases, dependency targets that exist and are components). A file that
//! passes every stage becomes an `Arc<Definition>` and, unless caching is
//! disabled, lands in the definition cache keyed by canonical path.

use regex::Regex;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::cache::{CacheStats, DefinitionCache};
use crate::core::{Result, UnitKind, WeftError};
use crate::definition::{ComponentDefinition, Definition, WorkflowDefinition};

static ALIAS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("alias pattern is a valid regex")
});

/// Alias reserved for the provider dispatch function inside templates.
const RESERVED_ALIAS: &str = "instruct";

/// Parses unit files into shared definitions.
///
/// The default loader reads through the process-wide
/// [`DefinitionCache`]; [`Loader::with_cache`] injects an isolated cache
/// and [`Loader::uncached`] re-parses on every call.
#[derive(Debug, Clone)]
pub struct Loader {
    cache: Option<Arc<DefinitionCache>>,
}

impl Default for Loader {
    /// Same as [`Loader::new`]: reads through the process-wide cache.
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Loader backed by the process-wide definition cache.
    pub fn new() -> Self {
        Self {
            cache: Some(DefinitionCache::global()),
        }
    }

    /// Loader backed by the given cache instance.
    pub fn with_cache(cache: Arc<DefinitionCache>) -> Self {
        Self { cache: Some(cache) }
    }

    /// Loader that re-parses from disk on every call.
    pub fn uncached() -> Self {
        Self { cache: None }
    }

    /// The cache this loader reads through, if caching is enabled.
    pub fn cache(&self) -> Option<&Arc<DefinitionCache>> {
        self.cache.as_ref()
    }

    /// Drop all cached definitions, forcing subsequent loads to re-parse.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Counters of the backing cache; `None` when caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Load a unit file of either kind, dispatching on its suffix.
    pub fn parse_file(&self, path: &Path) -> Result<Arc<Definition>> {
        let kind = UnitKind::from_path(path).ok_or_else(|| WeftError::InvalidPath {
            path: path.to_path_buf(),
            reason: format!(
                "filename must end with '{}' or '{}'",
                UnitKind::COMPONENT_SUFFIX,
                UnitKind::WORKFLOW_SUFFIX
            ),
        })?;
        self.load(path, kind)
    }

    /// Load a file that must be a component.
    pub fn parse_component(&self, path: &Path) -> Result<Arc<Definition>> {
        self.parse_expecting(path, UnitKind::Component)
    }

    /// Load a file that must be a workflow.
    pub fn parse_workflow(&self, path: &Path) -> Result<Arc<Definition>> {
        self.parse_expecting(path, UnitKind::Workflow)
    }

    fn parse_expecting(&self, path: &Path, expected: UnitKind) -> Result<Arc<Definition>> {
        let actual = UnitKind::from_path(path).ok_or_else(|| WeftError::InvalidPath {
            path: path.to_path_buf(),
            reason: format!("filename must end with '{}'", expected.suffix()),
        })?;
        if actual != expected {
            return Err(WeftError::UnexpectedUnitKind {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }
        self.load(path, expected)
    }

    fn load(&self, path: &Path, kind: UnitKind) -> Result<Arc<Definition>> {
        let canonical = std::fs::canonicalize(path).map_err(|e| WeftError::InvalidPath {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&canonical) {
                return Ok(cached);
            }
        }

        let raw = std::fs::read_to_string(&canonical).map_err(|e| {
            if e.kind() == IoErrorKind::InvalidData {
                WeftError::InvalidPath {
                    path: canonical.clone(),
                    reason: "file content is not valid UTF-8".to_string(),
                }
            } else {
                WeftError::IoError(e)
            }
        })?;

        let definition = Arc::new(parse_source(&canonical, kind, &raw)?);
        debug!(
            path = %canonical.display(),
            kind = %kind,
            name = definition.name(),
            "loaded unit definition"
        );

        match &self.cache {
            Some(cache) => Ok(cache.store(canonical, definition)),
            None => Ok(definition),
        }
    }
}

fn parse_source(path: &Path, kind: UnitKind, raw: &str) -> Result<Definition> {
    let value: toml::Value = toml::from_str(raw).map_err(|e| syntax_error(path, raw, &e))?;

    let definition = match kind {
        UnitKind::Component => {
            let mut component: ComponentDefinition =
                value.try_into().map_err(|e: toml::de::Error| WeftError::Schema {
                    file: path.to_path_buf(),
                    reason: e.message().to_string(),
                })?;
            component.source_path = Some(path.to_path_buf());
            validate_metadata(path, &component.metadata.name, kind)?;
            validate_uses(path, &component.metadata.name, &component.uses)?;
            Definition::Component(component)
        }
        UnitKind::Workflow => {
            let mut workflow: WorkflowDefinition =
                value.try_into().map_err(|e: toml::de::Error| WeftError::Schema {
                    file: path.to_path_buf(),
                    reason: e.message().to_string(),
                })?;
            workflow.source_path = Some(path.to_path_buf());
            validate_metadata(path, &workflow.metadata.name, kind)?;
            validate_uses(path, &workflow.metadata.name, &workflow.uses)?;
            Definition::Workflow(workflow)
        }
    };
    Ok(definition)
}

fn syntax_error(path: &Path, raw: &str, error: &toml::de::Error) -> WeftError {
    let (line, column) = match error.span() {
        Some(span) => {
            let (line, column) = offset_to_line_col(raw, span.start);
            (Some(line), Some(column))
        }
        None => (None, None),
    };
    WeftError::TomlSyntax {
        file: path.to_path_buf(),
        reason: error.message().to_string(),
        line,
        column,
    }
}

/// Translate a byte offset into 1-based line and column numbers.
///
/// Columns count characters, not bytes, and an offset that falls inside a
/// multi-byte character resolves to that character's position.
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (idx, ch) in source.char_indices() {
        if idx >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

fn validate_metadata(path: &Path, name: &str, kind: UnitKind) -> Result<()> {
    if name.trim().is_empty() {
        return Err(WeftError::Schema {
            file: path.to_path_buf(),
            reason: format!("{kind}.name must not be empty"),
        });
    }
    Ok(())
}

fn validate_uses(
    path: &Path,
    unit: &str,
    uses: &std::collections::BTreeMap<String, String>,
) -> Result<()> {
    for (alias, relative) in uses {
        if !ALIAS_PATTERN.is_match(alias) {
            return Err(WeftError::InvalidDependencyReference {
                unit: unit.to_string(),
                alias: alias.clone(),
                reason: "alias must be an identifier (letters, digits, underscores, not starting with a digit)".to_string(),
            });
        }
        if alias == RESERVED_ALIAS {
            return Err(WeftError::InvalidDependencyReference {
                unit: unit.to_string(),
                alias: alias.clone(),
                reason: format!("'{RESERVED_ALIAS}' is reserved for provider dispatch"),
            });
        }

        let target = dependency_target(path, relative);
        match UnitKind::from_path(&target) {
            Some(UnitKind::Component) => {}
            Some(UnitKind::Workflow) => {
                return Err(WeftError::InvalidDependencyReference {
                    unit: unit.to_string(),
                    alias: alias.clone(),
                    reason: format!(
                        "'{relative}' names a workflow; workflows cannot be dependency targets"
                    ),
                });
            }
            None => {
                return Err(WeftError::InvalidDependencyReference {
                    unit: unit.to_string(),
                    alias: alias.clone(),
                    reason: format!(
                        "'{relative}' must carry the '{}' suffix",
                        UnitKind::COMPONENT_SUFFIX
                    ),
                });
            }
        }

        if !target.is_file() {
            return Err(WeftError::MissingDependency {
                unit: unit.to_string(),
                alias: alias.clone(),
                reason: "file not found".to_string(),
                entry: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Resolve a declared dependency path against the defining file's directory.
pub(crate) fn dependency_target(defining_file: &Path, relative: &str) -> PathBuf {
    defining_file
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(relative)
}
