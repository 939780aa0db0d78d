//! Provider boundary for the `instruct` template function.
//!
//! Templates can delegate a piece of output to an external provider via
//! `{{ instruct(provider="name", ...) }}`. The core defines the [`Provider`]
//! trait and a name-keyed [`ProviderRegistry`]; hosts register concrete
//! implementations before rendering. The core ships no providers.

use dashmap::DashMap;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::compose::context::RenderContext;
use crate::core::{Result, WeftError};

/// An external capability a template can delegate to.
///
/// Implementations must be thread-safe; the registry hands out shared
/// references and a host may render from several threads.
pub trait Provider: Send + Sync {
    /// Registry name, as templates reference it in `provider="..."`.
    fn name(&self) -> &str;

    /// Produce output for one `instruct` call.
    ///
    /// `args` holds the call's keyword arguments minus the `provider` key;
    /// `context` is the render context of the unit making the call.
    /// Failures should use the provider error variants so hosts can tell
    /// bad arguments from execution faults.
    fn instruct(&self, args: &Map<String, Value>, context: &RenderContext) -> Result<String>;
}

/// Name-keyed registry of providers.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: DashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name, replacing any previous
    /// provider with that name.
    pub fn register(&self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| WeftError::ProviderNotFound {
                name: name.to_string(),
            })
    }

    /// Sorted names of all registered providers.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name())
            .finish()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
