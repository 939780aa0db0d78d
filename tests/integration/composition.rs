//! Full composition scenarios: recursive rendering, contract enforcement,
//! provider dispatch, and context inheritance.

use serde_json::{Map, Value, json};
use std::sync::Arc;
use tempfile::TempDir;

use weft::compose::{Composer, RenderContext};
use weft::core::{Result, WeftError};
use weft::provider::{Provider, ProviderRegistry};
use weft::resolver::Resolver;

use crate::common::{composer_for, leaf_component, write_unit};

fn props(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_nested_composition_three_levels() {
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "signature.component.toml",
        r#"
[component]
name = "Signature"

[props.author]
type = "string"
required = true

[template]
content = "-- {{ props.author }}"
"#,
    );
    write_unit(
        dir.path(),
        "footer.component.toml",
        r#"
[component]
name = "Footer"

[props.author]
type = "string"
required = true

[uses]
Signature = "./signature.component.toml"

[template]
content = "footer: {{ Signature(author=props.author) }}"
"#,
    );
    let entry = write_unit(
        dir.path(),
        "report.workflow.toml",
        r#"
[workflow]
name = "Report"

[uses]
Footer = "./footer.component.toml"

[template]
content = "body\n{{ Footer(author=\"Ada\") }}"
"#,
    );

    let result = composer_for(&entry).render_root(Map::new()).unwrap();
    assert_eq!(result.content, "body\nfooter: -- Ada");
    // Only the directly invoked alias is recorded; Signature is Footer's
    // own business.
    assert_eq!(result.used_components, vec!["Footer"]);
}

#[test]
fn test_same_component_name_different_files() {
    // Two components both named "Button" in different directories; aliases
    // bind by path, so each call site reaches its own file.
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "primary/button.component.toml",
        &leaf_component("Button", "primary-button"),
    );
    write_unit(
        dir.path(),
        "ghost/button.component.toml",
        &leaf_component("Button", "ghost-button"),
    );
    let entry = write_unit(
        dir.path(),
        "page.workflow.toml",
        r#"
[workflow]
name = "Page"

[uses]
Primary = "./primary/button.component.toml"
Ghost = "./ghost/button.component.toml"

[template]
content = "{{ Primary() }} | {{ Ghost() }}"
"#,
    );

    let composer = composer_for(&entry);
    assert_eq!(composer.resolution().unwrap().node_count(), 3);
    let result = composer.render_root(Map::new()).unwrap();
    assert_eq!(result.content, "primary-button | ghost-button");
    assert_eq!(result.used_components, vec!["Ghost", "Primary"]);
}

#[test]
fn test_diamond_renders_shared_component_at_each_call_site() {
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "chip.component.toml",
        r#"
[component]
name = "Chip"

[props.label]
type = "string"
required = true

[template]
content = "({{ props.label }})"
"#,
    );
    write_unit(
        dir.path(),
        "left.component.toml",
        r#"
[component]
name = "Left"

[uses]
Chip = "./chip.component.toml"

[template]
content = "L{{ Chip(label=\"l\") }}"
"#,
    );
    write_unit(
        dir.path(),
        "right.component.toml",
        r#"
[component]
name = "Right"

[uses]
Chip = "./chip.component.toml"

[template]
content = "R{{ Chip(label=\"r\") }}"
"#,
    );
    let entry = write_unit(
        dir.path(),
        "page.workflow.toml",
        r#"
[workflow]
name = "Page"

[uses]
Left = "./left.component.toml"
Right = "./right.component.toml"

[template]
content = "{{ Left() }} {{ Right() }}"
"#,
    );

    let composer = composer_for(&entry);
    assert_eq!(composer.resolution().unwrap().node_count(), 4);
    let result = composer.render_root(Map::new()).unwrap();
    assert_eq!(result.content, "L(l) R(r)");
    assert_eq!(result.used_components, vec!["Left", "Right"]);
}

#[test]
fn test_workflow_root_props_pass_through_unvalidated() {
    let dir = TempDir::new().unwrap();
    let entry = write_unit(
        dir.path(),
        "daily.workflow.toml",
        r#"
[workflow]
name = "Daily"

[template]
content = "Standup for {{ props.team }}"
"#,
    );

    let result = composer_for(&entry)
        .render_root(props(&[("team", json!("platform"))]))
        .unwrap();
    assert_eq!(result.content, "Standup for platform");
}

#[test]
fn test_child_sees_inherited_props_unless_shadowed() {
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "tone.component.toml",
        r#"
[component]
name = "Tone"

[template]
content = "tone={{ props.tone }}"
"#,
    );
    let entry = write_unit(
        dir.path(),
        "memo.workflow.toml",
        r#"
[workflow]
name = "Memo"

[uses]
Tone = "./tone.component.toml"

[template]
content = "{{ Tone() }} / {{ Tone(tone=\"formal\") }}"
"#,
    );

    let result = composer_for(&entry)
        .render_root(props(&[("tone", json!("casual"))]))
        .unwrap();
    assert_eq!(result.content, "tone=casual / tone=formal");
}

#[test]
fn test_contract_violation_deep_in_tree_aborts_whole_render() {
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "strict.component.toml",
        r#"
[component]
name = "Strict"

[props.key]
type = "string"
required = true

[template]
content = "{{ props.key }}"
"#,
    );
    write_unit(
        dir.path(),
        "wrapper.component.toml",
        r#"
[component]
name = "Wrapper"

[uses]
Strict = "./strict.component.toml"

[template]
content = "{{ Strict() }}"
"#,
    );
    let entry = write_unit(
        dir.path(),
        "page.workflow.toml",
        r#"
[workflow]
name = "Page"

[uses]
Wrapper = "./wrapper.component.toml"

[template]
content = "{{ Wrapper() }}"
"#,
    );

    let err = composer_for(&entry).render_root(Map::new()).unwrap_err();
    match err {
        WeftError::RequiredPropMissing { prop, component } => {
            assert_eq!(prop, "key");
            assert_eq!(component, "Strict");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

struct UppercaseProvider;

impl Provider for UppercaseProvider {
    fn name(&self) -> &str {
        "upper"
    }

    fn instruct(&self, args: &Map<String, Value>, _context: &RenderContext) -> Result<String> {
        let text = args.get("text").and_then(Value::as_str).ok_or_else(|| {
            WeftError::ProviderInvalidArguments {
                name: self.name().to_string(),
                reason: "missing string argument 'text'".to_string(),
            }
        })?;
        Ok(text.to_uppercase())
    }
}

#[test]
fn test_instruct_dispatches_to_registered_provider() {
    let dir = TempDir::new().unwrap();
    let entry = write_unit(
        dir.path(),
        "shout.component.toml",
        r#"
[component]
name = "Shout"

[template]
content = "{{ instruct(provider=\"upper\", text=\"quiet\") }}"
"#,
    );

    let registry = Arc::new(ProviderRegistry::new());
    registry.register(Arc::new(UppercaseProvider));
    let resolution = Resolver::without_cache().resolve(&entry).unwrap();
    let mut composer = Composer::with_providers(registry);
    composer.load_graph(resolution);

    let result = composer.render_root(Map::new()).unwrap();
    assert_eq!(result.content, "QUIET");
}

#[test]
fn test_instruct_with_unknown_provider_fails_structured() {
    let dir = TempDir::new().unwrap();
    let entry = write_unit(
        dir.path(),
        "shout.component.toml",
        r#"
[component]
name = "Shout"

[template]
content = "{{ instruct(provider=\"ghost\") }}"
"#,
    );

    let err = composer_for(&entry).render_root(Map::new()).unwrap_err();
    match err {
        WeftError::ProviderNotFound { name } => assert_eq!(name, "ghost"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_output_trimmed_only_at_public_boundary() {
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "pad.component.toml",
        "[component]\nname = \"Pad\"\n\n[template]\ncontent = \"  padded  \"\n",
    );
    let entry = write_unit(
        dir.path(),
        "page.workflow.toml",
        r#"
[workflow]
name = "Page"

[uses]
Pad = "./pad.component.toml"

[template]
content = "\n>{{ Pad() }}<\n"
"#,
    );

    let result = composer_for(&entry).render_root(Map::new()).unwrap();
    // Inner whitespace survives; only the outer edges are trimmed.
    assert_eq!(result.content, ">  padded  <");
}

#[test]
fn test_render_reads_nothing_from_disk_after_resolution() {
    // Once resolved, the graph carries every definition and alias target;
    // rendering must work even if the unit files are gone.
    let dir = TempDir::new().unwrap();
    let leaf = write_unit(
        dir.path(),
        "stamp.component.toml",
        &leaf_component("Stamp", "stamped"),
    );
    let entry = write_unit(
        dir.path(),
        "page.workflow.toml",
        r#"
[workflow]
name = "Page"

[uses]
Stamp = "./stamp.component.toml"

[template]
content = "{{ Stamp() }}!"
"#,
    );

    let composer = composer_for(&entry);
    assert_eq!(composer.resolution().unwrap().node_count(), 2);
    std::fs::remove_file(&leaf).unwrap();
    std::fs::remove_file(&entry).unwrap();

    let result = composer.render_root(Map::new()).unwrap();
    assert_eq!(result.content, "stamped!");
    assert_eq!(result.used_components, vec!["Stamp"]);
}

#[test]
fn test_render_result_used_components_sorted_and_deduplicated() {
    let dir = TempDir::new().unwrap();
    write_unit(
        dir.path(),
        "zeta.component.toml",
        &leaf_component("Zeta", "z"),
    );
    write_unit(
        dir.path(),
        "alpha.component.toml",
        &leaf_component("Alpha", "a"),
    );
    let entry = write_unit(
        dir.path(),
        "page.workflow.toml",
        r#"
[workflow]
name = "Page"

[uses]
Zeta = "./zeta.component.toml"
Alpha = "./alpha.component.toml"

[template]
content = "{{ Zeta() }}{{ Alpha() }}{{ Zeta() }}"
"#,
    );

    let result = composer_for(&entry).render_root(Map::new()).unwrap();
    assert_eq!(result.used_components, vec!["Alpha", "Zeta"]);
}
