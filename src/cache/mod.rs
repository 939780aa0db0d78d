//! Parsed-definition cache keyed by canonical file path.
//!
//! Parsing the same unit file repeatedly across resolutions is wasted work,
//! so the loader consults a [`DefinitionCache`] before touching the disk.
//! The cache is a concurrent map of canonical path -> `Arc<Definition>` with
//! hit/miss counters. A process-wide instance backs the default loader
//! configuration; callers that need isolation (or no caching at all) inject
//! their own instance or opt out entirely.
//!
//! Insertion is atomic check-then-insert: when two callers race to populate
//! the same path, the first write wins and both observe the same `Arc`.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::trace;

use crate::definition::Definition;

static GLOBAL_CACHE: LazyLock<Arc<DefinitionCache>> =
    LazyLock::new(|| Arc::new(DefinitionCache::new()));

/// Point-in-time counters for a [`DefinitionCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached definitions.
    pub entries: usize,
    /// Lookups that found an entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
}

impl CacheStats {
    /// Hit ratio in `[0.0, 1.0]`; zero when no lookups have happened.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Concurrent cache of parsed definitions keyed by canonical path.
#[derive(Debug, Default)]
pub struct DefinitionCache {
    entries: DashMap<PathBuf, Arc<Definition>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DefinitionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide shared cache used by default-configured loaders.
    pub fn global() -> Arc<Self> {
        GLOBAL_CACHE.clone()
    }

    /// Look up a definition by canonical path, updating the counters.
    pub fn get(&self, path: &Path) -> Option<Arc<Definition>> {
        match self.entries.get(path) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(path = %path.display(), "definition cache hit");
                Some(entry.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a definition unless the path is already populated.
    ///
    /// Returns the cached `Arc`, which is the existing entry when another
    /// writer got there first. Callers must use the returned value so all
    /// holders share one allocation per path.
    pub fn store(&self, path: PathBuf, definition: Arc<Definition>) -> Arc<Definition> {
        self.entries.entry(path).or_insert(definition).clone()
    }

    /// Drop every cached definition. Counters are preserved.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached definitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no definitions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot the counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
