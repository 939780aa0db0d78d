//! Dependency resolution: from an entry file to a complete, acyclic graph.
//!
//! The resolver loads the entry unit, then walks its dependency map
//! depth-first, loading each declared component and adding nodes and edges
//! as it goes. A dependency that matches a unit already on the expansion
//! stack is a cycle and fails the whole resolution with the chain of unit
//! names. Units already in the graph are linked without re-expansion, so a
//! diamond produces one node per file. The finished [`Resolution`] carries
//! the graph, the canonical entry path, and a dependency-first topological
//! order.

pub mod dependency_graph;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::cache::DefinitionCache;
use crate::core::{Result, WeftError};
use crate::definition::{Definition, Loader, loader::dependency_target};

pub use dependency_graph::{DependencyGraph, DependencyNode};

/// The outcome of resolving an entry file.
#[derive(Debug)]
pub struct Resolution {
    /// The complete dependency graph.
    pub graph: DependencyGraph,
    /// Canonical path of the entry unit.
    pub root: PathBuf,
    /// Canonical paths in dependency-first order; the root is last.
    pub order: Vec<PathBuf>,
}

impl Resolution {
    /// Number of distinct units in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// The entry unit's node.
    pub fn root_node(&self) -> Result<&DependencyNode> {
        self.graph
            .get(&self.root)
            .ok_or_else(|| WeftError::ResolutionFailed {
                reason: format!("entry '{}' is not in its own graph", self.root.display()),
            })
    }

    /// The entry unit's definition.
    pub fn root_definition(&self) -> Result<&Arc<Definition>> {
        Ok(&self.root_node()?.definition)
    }
}

/// Builds dependency graphs from entry files.
#[derive(Debug, Clone)]
pub struct Resolver {
    loader: Loader,
}

impl Default for Resolver {
    /// Same as [`Resolver::new`]: reads through the process-wide cache.
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Resolver reading through the process-wide definition cache.
    pub fn new() -> Self {
        Self {
            loader: Loader::new(),
        }
    }

    /// Resolver reading through the given cache instance.
    pub fn with_cache(cache: Arc<DefinitionCache>) -> Self {
        Self {
            loader: Loader::with_cache(cache),
        }
    }

    /// Resolver that re-parses every file on every resolution.
    pub fn without_cache() -> Self {
        Self {
            loader: Loader::uncached(),
        }
    }

    /// Select between the process-wide cache and no caching at all.
    pub fn with_global_cache(enabled: bool) -> Self {
        if enabled { Self::new() } else { Self::without_cache() }
    }

    /// The loader this resolver reads units through.
    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Resolve an entry file of either kind into a complete graph.
    ///
    /// Any failure (unloadable dependency, cycle) aborts the whole
    /// resolution; no partial graph is returned.
    pub fn resolve(&self, entry: &Path) -> Result<Resolution> {
        let root_definition = self.loader.parse_file(entry)?;
        let root_path = root_definition
            .source_path()
            .map(Path::to_path_buf)
            .ok_or_else(|| WeftError::ResolutionFailed {
                reason: format!("loader returned '{}' without a source path", entry.display()),
            })?;

        let mut graph = DependencyGraph::new();
        let mut stack: Vec<(PathBuf, String)> = Vec::new();
        self.expand(&root_path, &root_definition, &mut graph, &mut stack, &root_path)?;

        let order = graph.topological_order()?;
        debug!(
            entry = %root_path.display(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "resolved dependency graph"
        );
        Ok(Resolution {
            graph,
            root: root_path,
            order,
        })
    }

    fn expand(
        &self,
        path: &Path,
        definition: &Arc<Definition>,
        graph: &mut DependencyGraph,
        stack: &mut Vec<(PathBuf, String)>,
        entry: &Path,
    ) -> Result<()> {
        graph.ensure_node(DependencyNode {
            path: path.to_path_buf(),
            kind: definition.kind(),
            definition: definition.clone(),
            targets: BTreeMap::new(),
        });

        stack.push((path.to_path_buf(), definition.name().to_string()));
        let outcome = self.expand_dependencies(path, definition, graph, stack, entry);
        stack.pop();
        outcome
    }

    fn expand_dependencies(
        &self,
        path: &Path,
        definition: &Arc<Definition>,
        graph: &mut DependencyGraph,
        stack: &mut Vec<(PathBuf, String)>,
        entry: &Path,
    ) -> Result<()> {
        // BTreeMap iteration keeps discovery order stable across runs.
        for (alias, relative) in definition.uses() {
            let declared = dependency_target(path, relative);
            let target = std::fs::canonicalize(&declared).map_err(|e| {
                WeftError::MissingDependency {
                    unit: definition.name().to_string(),
                    alias: alias.clone(),
                    reason: e.to_string(),
                    entry: entry.to_path_buf(),
                }
            })?;

            if let Some(start) = stack.iter().position(|(p, _)| p == &target) {
                let mut chain: Vec<String> =
                    stack[start..].iter().map(|(_, name)| name.clone()).collect();
                chain.push(chain[0].clone());
                return Err(WeftError::CircularDependency {
                    chain,
                    entry: entry.to_path_buf(),
                });
            }

            if !graph.contains(&target) {
                let dependency = self
                    .loader
                    .parse_component(&target)
                    .map_err(|e| attribute_load_failure(e, definition.name(), alias, entry))?;
                self.expand(&target, &dependency, graph, stack, entry)?;
            }
            graph.add_edge(path, &target)?;
            graph.record_target(path, alias, target)?;
        }
        Ok(())
    }
}

/// Fold a dependency load failure into the resolution error contract:
/// cycles pass through, everything else becomes a missing-dependency error
/// attributed to the entry file.
fn attribute_load_failure(
    error: WeftError,
    unit: &str,
    alias: &str,
    entry: &Path,
) -> WeftError {
    match error {
        cycle @ WeftError::CircularDependency { .. } => cycle.attributed_to(entry),
        WeftError::MissingDependency {
            unit: inner_unit,
            alias: inner_alias,
            reason,
            ..
        } => WeftError::MissingDependency {
            unit: inner_unit,
            alias: inner_alias,
            reason,
            entry: entry.to_path_buf(),
        },
        other => WeftError::MissingDependency {
            unit: unit.to_string(),
            alias: alias.to_string(),
            reason: other.to_string(),
            entry: entry.to_path_buf(),
        },
    }
}
