//! Directed dependency graph over loaded unit definitions.
//!
//! Nodes are identified by canonical file path; two units with the same
//! name in different files are distinct nodes. Edges point from a unit to
//! the components it uses. The graph is append-only during resolution and
//! queried read-only during composition.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::{Result, UnitKind, WeftError};
use crate::definition::Definition;

/// One unit in the dependency graph.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    /// Canonical path of the unit file. Node identity.
    pub path: PathBuf,
    /// Kind of the unit.
    pub kind: UnitKind,
    /// The loaded definition.
    pub definition: Arc<Definition>,
    /// Declared aliases resolved to the canonical paths of their targets.
    /// Recorded during resolution so rendering never re-touches the
    /// filesystem.
    pub targets: BTreeMap<String, PathBuf>,
}

impl DependencyNode {
    /// Unit name from the definition metadata.
    pub fn name(&self) -> &str {
        self.definition.name()
    }
}

impl PartialEq for DependencyNode {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for DependencyNode {}

impl Hash for DependencyNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for DependencyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.path.display())
    }
}

/// Dependency graph with path-keyed node lookup.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<DependencyNode, ()>,
    index: HashMap<PathBuf, NodeIndex>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, deduplicating by path. Returns its index.
    pub fn ensure_node(&mut self, node: DependencyNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.path) {
            return idx;
        }
        let path = node.path.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(path, idx);
        idx
    }

    /// Add a dependency edge from `from` to `to`, deduplicating.
    ///
    /// Both endpoints must already be in the graph.
    pub fn add_edge(&mut self, from: &Path, to: &Path) -> Result<()> {
        let from_idx = self.node_index(from)?;
        let to_idx = self.node_index(to)?;
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, ());
        }
        Ok(())
    }

    /// Record the canonical target a unit's alias resolved to.
    pub fn record_target(&mut self, unit: &Path, alias: &str, target: PathBuf) -> Result<()> {
        let idx = self.node_index(unit)?;
        self.graph[idx].targets.insert(alias.to_string(), target);
        Ok(())
    }

    fn node_index(&self, path: &Path) -> Result<NodeIndex> {
        self.index
            .get(path)
            .copied()
            .ok_or_else(|| WeftError::ResolutionFailed {
                reason: format!("'{}' is not a node in the graph", path.display()),
            })
    }

    /// Whether a unit with the given canonical path is in the graph.
    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_key(path)
    }

    /// Look up a node by canonical path.
    pub fn get(&self, path: &Path) -> Option<&DependencyNode> {
        self.index.get(path).map(|&idx| &self.graph[idx])
    }

    /// Number of units in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of dependency edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph holds no units.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Iterate over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.graph.node_weights()
    }

    /// The direct dependencies of a unit, in edge insertion order.
    pub fn direct_dependencies(&self, path: &Path) -> Vec<&DependencyNode> {
        match self.index.get(path) {
            Some(&idx) => self
                .graph
                .neighbors(idx)
                .map(|dep| &self.graph[dep])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Canonical paths in dependency-first topological order: every unit
    /// appears after all units it depends on, the root last.
    pub fn topological_order(&self) -> Result<Vec<PathBuf>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            let node = &self.graph[cycle.node_id()];
            WeftError::ResolutionFailed {
                reason: format!("dependency cycle through '{}'", node.name()),
            }
        })?;
        Ok(sorted
            .into_iter()
            .rev()
            .map(|idx| self.graph[idx].path.clone())
            .collect())
    }
}
