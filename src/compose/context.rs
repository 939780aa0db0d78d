//! Render contexts: the prop environment a unit's template evaluates in.
//!
//! Each unit in a composition gets its own [`RenderContext`] holding the
//! props supplied at its invocation site (defaults already applied) plus a
//! link to the invoking unit's context. Lookup walks the parent chain, so a
//! child sees inherited values without the parent losing ownership of them.
//! Contexts are immutable once built and shared behind `Arc` because the
//! template engine's invocation functions capture them.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::definition::UnitMetadata;

/// Immutable prop environment for one unit render.
#[derive(Debug)]
pub struct RenderContext {
    props: Map<String, Value>,
    parent: Option<Arc<RenderContext>>,
    metadata: UnitMetadata,
}

impl RenderContext {
    /// Context for the root unit of a composition.
    pub fn root(props: Map<String, Value>, metadata: UnitMetadata) -> Arc<Self> {
        Arc::new(Self {
            props,
            parent: None,
            metadata,
        })
    }

    /// Context for a unit invoked from `parent`'s template.
    pub fn child(
        parent: &Arc<RenderContext>,
        props: Map<String, Value>,
        metadata: UnitMetadata,
    ) -> Arc<Self> {
        Arc::new(Self {
            props,
            parent: Some(parent.clone()),
            metadata,
        })
    }

    /// Props supplied at this unit's own invocation site.
    pub fn props(&self) -> &Map<String, Value> {
        &self.props
    }

    /// Metadata of the unit this context belongs to.
    pub fn metadata(&self) -> &UnitMetadata {
        &self.metadata
    }

    /// The invoking unit's context, if this is not the root.
    pub fn parent(&self) -> Option<&Arc<RenderContext>> {
        self.parent.as_ref()
    }

    /// Look up a prop, walking the parent chain on a miss.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        match self.props.get(key) {
            Some(value) => Some(value),
            None => self.parent.as_deref().and_then(|p| p.lookup(key)),
        }
    }

    /// All visible props merged across the parent chain; the nearest
    /// definition of a name wins.
    pub fn effective_props(&self) -> Map<String, Value> {
        let mut merged = match self.parent.as_deref() {
            Some(parent) => parent.effective_props(),
            None => Map::new(),
        };
        for (key, value) in &self.props {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Distance from the root context (root is 0).
    pub fn depth(&self) -> usize {
        match self.parent.as_deref() {
            Some(parent) => parent.depth() + 1,
            None => 0,
        }
    }
}
