//! Dependency graph construction against real file trees.

use std::sync::Arc;
use tempfile::TempDir;

use weft::cache::DefinitionCache;
use weft::core::WeftError;
use weft::resolver::Resolver;

use crate::common::{init_test_logging, leaf_component, write_unit};

#[test]
fn test_workflow_chain_resolves_dependencies_first() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    write_unit(dir.path(), "b.component.toml", &leaf_component("B", "b"));
    write_unit(
        dir.path(),
        "a.component.toml",
        "[component]\nname = \"A\"\n\n[uses]\nB = \"./b.component.toml\"\n\n[template]\ncontent = \"{{ B() }}\"\n",
    );
    let entry = write_unit(
        dir.path(),
        "w.workflow.toml",
        "[workflow]\nname = \"W\"\n\n[uses]\nA = \"./a.component.toml\"\n\n[template]\ncontent = \"{{ A() }}\"\n",
    );

    let resolution = Resolver::without_cache().resolve(&entry).unwrap();
    assert_eq!(resolution.node_count(), 3);
    let names: Vec<&str> = resolution
        .order
        .iter()
        .map(|p| resolution.graph.get(p).unwrap().name())
        .collect();
    assert_eq!(names, vec!["B", "A", "W"]);
    assert_eq!(resolution.root_node().unwrap().name(), "W");
}

#[test]
fn test_units_in_subdirectories_resolve_relative_paths() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "lib/icon.component.toml",
        &leaf_component("Icon", "icon"),
    );
    write_unit(
        dir.path(),
        "lib/card.component.toml",
        "[component]\nname = \"Card\"\n\n[uses]\nIcon = \"./icon.component.toml\"\n\n[template]\ncontent = \"{{ Icon() }}\"\n",
    );
    let entry = write_unit(
        dir.path(),
        "page.workflow.toml",
        "[workflow]\nname = \"Page\"\n\n[uses]\nCard = \"./lib/card.component.toml\"\n\n[template]\ncontent = \"{{ Card() }}\"\n",
    );

    let resolution = Resolver::without_cache().resolve(&entry).unwrap();
    assert_eq!(resolution.node_count(), 3);
}

#[test]
fn test_three_node_cycle_reports_full_chain() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "a.component.toml",
        "[component]\nname = \"A\"\n\n[uses]\nB = \"./b.component.toml\"\n\n[template]\ncontent = \"x\"\n",
    );
    write_unit(
        dir.path(),
        "b.component.toml",
        "[component]\nname = \"B\"\n\n[uses]\nC = \"./c.component.toml\"\n\n[template]\ncontent = \"x\"\n",
    );
    write_unit(
        dir.path(),
        "c.component.toml",
        "[component]\nname = \"C\"\n\n[uses]\nA = \"./a.component.toml\"\n\n[template]\ncontent = \"x\"\n",
    );
    let entry = dir.path().join("a.component.toml");

    let err = Resolver::without_cache().resolve(&entry).unwrap_err();
    let message = err.to_string();
    match err {
        WeftError::CircularDependency { chain, entry: at } => {
            assert_eq!(chain, vec!["A", "B", "C", "A"]);
            assert!(at.ends_with("a.component.toml"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(message.contains("Circular dependency detected: A -> B -> C -> A"));
}

#[test]
fn test_missing_transitive_dependency_names_owner_and_entry() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "mid.component.toml",
        "[component]\nname = \"Mid\"\n\n[uses]\nGone = \"./gone.component.toml\"\n\n[template]\ncontent = \"x\"\n",
    );
    let entry = write_unit(
        dir.path(),
        "top.workflow.toml",
        "[workflow]\nname = \"Top\"\n\n[uses]\nMid = \"./mid.component.toml\"\n\n[template]\ncontent = \"{{ Mid() }}\"\n",
    );

    let err = Resolver::without_cache().resolve(&entry).unwrap_err();
    match err {
        WeftError::MissingDependency {
            unit,
            alias,
            entry: at,
            ..
        } => {
            assert_eq!(unit, "Mid");
            assert_eq!(alias, "Gone");
            assert!(at.ends_with("top.workflow.toml"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_malformed_transitive_dependency_fails_whole_resolution() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "broken.component.toml",
        "[component\nname = \"Broken\"\n",
    );
    let entry = write_unit(
        dir.path(),
        "top.workflow.toml",
        "[workflow]\nname = \"Top\"\n\n[uses]\nBroken = \"./broken.component.toml\"\n\n[template]\ncontent = \"{{ Broken() }}\"\n",
    );

    let err = Resolver::without_cache().resolve(&entry).unwrap_err();
    match err {
        WeftError::MissingDependency { unit, alias, .. } => {
            assert_eq!(unit, "Top");
            assert_eq!(alias, "Broken");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_unrecognized_entry_suffix_is_rejected() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let entry = write_unit(dir.path(), "plain.toml", &leaf_component("Plain", "x"));
    let err = Resolver::without_cache().resolve(&entry).unwrap_err();
    assert!(matches!(err, WeftError::InvalidPath { .. }));
}

#[test]
fn test_shared_cache_survives_across_resolutions() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "shared.component.toml",
        &leaf_component("Shared", "s"),
    );
    let first_entry = write_unit(
        dir.path(),
        "one.workflow.toml",
        "[workflow]\nname = \"One\"\n\n[uses]\nShared = \"./shared.component.toml\"\n\n[template]\ncontent = \"{{ Shared() }}\"\n",
    );
    let second_entry = write_unit(
        dir.path(),
        "two.workflow.toml",
        "[workflow]\nname = \"Two\"\n\n[uses]\nShared = \"./shared.component.toml\"\n\n[template]\ncontent = \"{{ Shared() }}\"\n",
    );

    let cache = Arc::new(DefinitionCache::new());
    let resolver = Resolver::with_cache(cache.clone());
    resolver.resolve(&first_entry).unwrap();
    assert_eq!(cache.len(), 2);

    // The second entry re-uses the shared component without re-parsing it.
    resolver.resolve(&second_entry).unwrap();
    assert_eq!(cache.len(), 3);
    assert!(cache.stats().hits >= 1);
}

#[test]
fn test_disabled_cache_reparses_every_resolution() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let entry = write_unit(
        dir.path(),
        "leaf.component.toml",
        &leaf_component("Leaf", "x"),
    );

    let resolver = Resolver::without_cache();
    let first = resolver.resolve(&entry).unwrap();
    let second = resolver.resolve(&entry).unwrap();
    let a = first.root_definition().unwrap();
    let b = second.root_definition().unwrap();
    assert!(!Arc::ptr_eq(a, b));
    assert!(resolver.loader().cache_stats().is_none());
}

#[test]
fn test_cleared_cache_reloads_edited_definition() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let entry = write_unit(
        dir.path(),
        "leaf.component.toml",
        &leaf_component("Before", "x"),
    );

    let cache = Arc::new(DefinitionCache::new());
    let resolver = Resolver::with_cache(cache.clone());
    let first = resolver.resolve(&entry).unwrap();
    assert_eq!(first.root_node().unwrap().name(), "Before");

    write_unit(
        dir.path(),
        "leaf.component.toml",
        &leaf_component("After", "x"),
    );
    // Stale until cleared.
    let stale = resolver.resolve(&entry).unwrap();
    assert_eq!(stale.root_node().unwrap().name(), "Before");

    resolver.loader().clear_cache();
    let fresh = resolver.resolve(&entry).unwrap();
    assert_eq!(fresh.root_node().unwrap().name(), "After");
}
