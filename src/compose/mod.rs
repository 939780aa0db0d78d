//! Template composition engine.
//!
//! A [`Composer`] renders a unit against a resolved dependency graph. Each
//! unit render gets a fresh Tera instance with one registered function per
//! declared alias, so `{{ Button(text="Go") }}` in a template body invokes
//! the dependency registered under `Button`: the call's keyword arguments
//! are validated against the target component's prop contract, defaults are
//! applied, a child render context is built, and the dependency's own
//! template renders recursively with its own invocation table. The child's
//! output is substituted at the call site as a plain string.
//!
//! Tera reports failures as stringly-typed errors; structured weft errors
//! raised inside invocation functions are carried out through a side slot
//! so they surface unchanged, and the remaining engine errors are
//! translated by pattern into the taxonomy (unknown functions become
//! undeclared-alias errors with a closest-match suggestion).

pub mod context;
pub mod props;

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use tera::Tera;
use tracing::{debug, trace};

use crate::core::{ErrorKind, Result, UnitKind, WeftError};
use crate::definition::Definition;
use crate::provider::ProviderRegistry;
use crate::resolver::Resolution;

pub use context::RenderContext;
pub use props::{apply_defaults, validate_props};

static FUNCTION_NOT_FOUND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Function '([A-Za-z_][A-Za-z0-9_]*)' not found")
        .expect("function pattern is a valid regex")
});

static VARIABLE_NOT_FOUND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Variable `([^`]+)` not found").expect("variable pattern is a valid regex")
});

/// Name of the provider dispatch function exposed to every template.
const INSTRUCT_FUNCTION: &str = "instruct";

/// The outcome of composing one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    /// Final composed text, trimmed of leading and trailing whitespace.
    pub content: String,
    /// Sorted, deduplicated aliases invoked at the directly rendered
    /// level. Aliases a dependency invokes inside its own template are its
    /// own business and do not appear here.
    pub used_components: Vec<String>,
}

/// Output of one unit render inside a composition. Interior renders keep
/// their whitespace; only the public boundary trims.
struct RenderedUnit {
    content: String,
    used: BTreeSet<String>,
}

/// Where an invocation function was registered from, for error reporting
/// and graph lookup.
struct InvocationSite {
    alias: String,
    unit: String,
    /// Canonical path of the unit that declared the alias.
    unit_path: Option<PathBuf>,
}

/// Renders units against a loaded dependency graph.
#[derive(Debug, Default)]
pub struct Composer {
    resolution: Option<Arc<Resolution>>,
    providers: Arc<ProviderRegistry>,
}

impl Composer {
    /// Composer with no graph loaded and an empty provider registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Composer sharing the given provider registry.
    pub fn with_providers(providers: Arc<ProviderRegistry>) -> Self {
        Self {
            resolution: None,
            providers,
        }
    }

    /// The provider registry templates dispatch `instruct` calls to.
    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    /// Load a resolved dependency graph, replacing any previous one.
    pub fn load_graph(&mut self, resolution: Resolution) {
        self.resolution = Some(Arc::new(resolution));
    }

    /// The currently loaded resolution, if any.
    pub fn resolution(&self) -> Option<&Arc<Resolution>> {
        self.resolution.as_ref()
    }

    /// Render the entry unit of the loaded graph.
    pub fn render_root(&self, props: Map<String, Value>) -> Result<RenderResult> {
        let resolution = self
            .resolution
            .as_ref()
            .ok_or(WeftError::GraphNotLoaded)?;
        let definition = resolution.root_definition()?.clone();
        self.render(&definition, props)
    }

    /// Render a component definition with the given props.
    pub fn render_component(
        &self,
        definition: &Arc<Definition>,
        props: Map<String, Value>,
    ) -> Result<RenderResult> {
        expect_kind(definition, UnitKind::Component)?;
        self.render(definition, props)
    }

    /// Render a workflow definition. The props object is passed through to
    /// the template unvalidated; workflows declare no contract.
    pub fn render_workflow(
        &self,
        definition: &Arc<Definition>,
        props: Map<String, Value>,
    ) -> Result<RenderResult> {
        expect_kind(definition, UnitKind::Workflow)?;
        self.render(definition, props)
    }

    fn render(
        &self,
        definition: &Arc<Definition>,
        mut props: Map<String, Value>,
    ) -> Result<RenderResult> {
        let resolution = self
            .resolution
            .clone()
            .ok_or(WeftError::GraphNotLoaded)?;

        if let Some(component) = definition.as_component() {
            props::validate_props(definition.name(), &component.props, &props)?;
            props::apply_defaults(&component.props, &mut props);
        }

        let context = RenderContext::root(props, definition.metadata().clone());
        let rendered = render_definition(&resolution, &self.providers, definition, &context)?;
        debug!(
            unit = definition.name(),
            kind = %definition.kind(),
            used = rendered.used.len(),
            "composed unit"
        );
        Ok(RenderResult {
            content: rendered.content.trim().to_string(),
            used_components: rendered.used.into_iter().collect(),
        })
    }
}

fn expect_kind(definition: &Arc<Definition>, expected: UnitKind) -> Result<()> {
    let actual = definition.kind();
    if actual != expected {
        return Err(WeftError::UnexpectedUnitKind {
            path: definition
                .source_path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(definition.name())),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Render one unit's template inside a composition.
///
/// Builds a fresh engine, registers the unit's invocation table and the
/// provider dispatch function, and evaluates the template body against the
/// unit's effective props.
fn render_definition(
    resolution: &Arc<Resolution>,
    providers: &Arc<ProviderRegistry>,
    definition: &Arc<Definition>,
    context: &Arc<RenderContext>,
) -> Result<RenderedUnit> {
    let used: Arc<Mutex<BTreeSet<String>>> = Arc::default();
    let slot: Arc<Mutex<Option<WeftError>>> = Arc::default();
    let unit_path = definition.source_path().map(Path::to_path_buf);

    let mut tera = Tera::default();
    for alias in definition.uses().keys() {
        let site = InvocationSite {
            alias: alias.clone(),
            unit: definition.name().to_string(),
            unit_path: unit_path.clone(),
        };
        tera.register_function(
            alias,
            invocation_function(
                site,
                resolution.clone(),
                providers.clone(),
                context.clone(),
                used.clone(),
                slot.clone(),
            ),
        );
    }
    tera.register_function(
        INSTRUCT_FUNCTION,
        instruct_function(providers.clone(), context.clone(), slot.clone()),
    );

    let mut tera_context = tera::Context::new();
    tera_context.insert("props", &Value::Object(context.effective_props()));
    tera_context.insert("unit", context.metadata());

    trace!(unit = definition.name(), depth = context.depth(), "rendering template");
    let content = tera
        .render_str(definition.template_content(), &tera_context)
        .map_err(|error| translate_render_error(&error, definition, &slot))?;

    let used = match used.lock() {
        Ok(guard) => guard.clone(),
        Err(_) => BTreeSet::new(),
    };
    Ok(RenderedUnit { content, used })
}

/// Build the Tera function for one declared alias.
fn invocation_function(
    site: InvocationSite,
    resolution: Arc<Resolution>,
    providers: Arc<ProviderRegistry>,
    parent: Arc<RenderContext>,
    used: Arc<Mutex<BTreeSet<String>>>,
    slot: Arc<Mutex<Option<WeftError>>>,
) -> impl Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync {
    move |args| {
        match invoke_dependency(&site, &resolution, &providers, &parent, args, &used) {
            Ok(content) => Ok(Value::String(content)),
            Err(error) => Err(stash_error(&slot, error)),
        }
    }
}

/// Resolve, validate, and recursively render one dependency invocation.
fn invoke_dependency(
    site: &InvocationSite,
    resolution: &Arc<Resolution>,
    providers: &Arc<ProviderRegistry>,
    parent: &Arc<RenderContext>,
    args: &HashMap<String, Value>,
    used: &Arc<Mutex<BTreeSet<String>>>,
) -> Result<String> {
    let not_in_graph = || WeftError::ComponentNotInGraph {
        alias: site.alias.clone(),
        unit: site.unit.clone(),
    };

    // Aliases bind to canonical paths, not names: two components sharing a
    // name in different files stay distinct. The resolver recorded every
    // alias's canonical target on the owning node, so this is a pure graph
    // lookup with no filesystem access.
    let unit_path = site.unit_path.as_deref().ok_or_else(not_in_graph)?;
    let owner = resolution.graph.get(unit_path).ok_or_else(not_in_graph)?;
    let target = owner.targets.get(&site.alias).ok_or_else(not_in_graph)?;
    let node = resolution.graph.get(target).ok_or_else(not_in_graph)?;

    let component =
        node.definition
            .as_component()
            .ok_or_else(|| WeftError::InvalidDependencyReference {
                unit: site.unit.clone(),
                alias: site.alias.clone(),
                reason: "dependency resolves to a workflow".to_string(),
            })?;

    let mut supplied: Map<String, Value> =
        args.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    props::validate_props(&component.metadata.name, &component.props, &supplied)?;
    props::apply_defaults(&component.props, &mut supplied);

    trace!(
        alias = %site.alias,
        component = %component.metadata.name,
        from = %site.unit,
        "invoking dependency"
    );
    let child = RenderContext::child(parent, supplied, component.metadata.clone());
    let rendered = render_definition(resolution, providers, &node.definition, &child)?;

    if let Ok(mut set) = used.lock() {
        set.insert(site.alias.clone());
    }
    Ok(rendered.content)
}

/// Build the `instruct` provider-dispatch Tera function.
fn instruct_function(
    providers: Arc<ProviderRegistry>,
    context: Arc<RenderContext>,
    slot: Arc<Mutex<Option<WeftError>>>,
) -> impl Fn(&HashMap<String, Value>) -> tera::Result<Value> + Send + Sync {
    move |args| match dispatch_instruct(&providers, &context, args) {
        Ok(content) => Ok(Value::String(content)),
        Err(error) => Err(stash_error(&slot, error)),
    }
}

fn dispatch_instruct(
    providers: &Arc<ProviderRegistry>,
    context: &Arc<RenderContext>,
    args: &HashMap<String, Value>,
) -> Result<String> {
    let name = args.get("provider").and_then(Value::as_str).ok_or_else(|| {
        WeftError::ProviderInvalidArguments {
            name: "unspecified".to_string(),
            reason: format!("{INSTRUCT_FUNCTION} requires a string argument 'provider'"),
        }
    })?;
    let provider = providers.get(name)?;

    let forwarded: Map<String, Value> = args
        .iter()
        .filter(|(key, _)| key.as_str() != "provider")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    provider
        .instruct(&forwarded, context)
        .map_err(|error| match error.kind() {
            ErrorKind::Provider => error,
            _ => WeftError::ProviderExecutionFailed {
                name: name.to_string(),
                reason: error.to_string(),
            },
        })
}

/// Park a structured error in the side slot and hand Tera a stringly twin.
fn stash_error(slot: &Mutex<Option<WeftError>>, error: WeftError) -> tera::Error {
    let message = error.to_string();
    if let Ok(mut parked) = slot.lock() {
        if parked.is_none() {
            *parked = Some(error);
        }
    }
    tera::Error::msg(message)
}

/// Turn a Tera failure back into a structured error.
///
/// A parked error from an invocation or provider function wins outright.
/// Otherwise the engine's message chain is pattern-matched: an unknown
/// function becomes an undeclared-alias error with a closest-match
/// suggestion, and everything else becomes a template-render error with the
/// cleaned-up engine message.
fn translate_render_error(
    error: &tera::Error,
    definition: &Arc<Definition>,
    slot: &Mutex<Option<WeftError>>,
) -> WeftError {
    if let Ok(mut parked) = slot.lock() {
        if let Some(inner) = parked.take() {
            return inner;
        }
    }

    let chain = collect_error_chain(error);
    if let Some(captures) = FUNCTION_NOT_FOUND_PATTERN.captures(&chain) {
        let alias = captures[1].to_string();
        if alias != INSTRUCT_FUNCTION && !definition.uses().contains_key(&alias) {
            let suggestion = closest_alias(&alias, definition.uses().keys());
            return WeftError::AliasNotDeclared {
                alias,
                unit: definition.name().to_string(),
                suggestion,
            };
        }
    }

    let reason = match VARIABLE_NOT_FOUND_PATTERN.captures(&chain) {
        Some(captures) => format!("template variable '{}' is undefined", &captures[1]),
        None => chain,
    };
    WeftError::TemplateRender {
        unit: definition.name().to_string(),
        kind: definition.kind().to_string(),
        reason,
    }
}

/// Flatten a Tera error and its sources into one message, scrubbing the
/// engine's one-off template name out of each link.
fn collect_error_chain(error: &tera::Error) -> String {
    let mut messages: Vec<String> = Vec::new();
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = current {
        let text = err
            .to_string()
            .replace(" while rendering '__tera_one_off'", "")
            .replace("Failed to render '__tera_one_off'", "");
        let text = text.trim().trim_start_matches(':').trim();
        if !text.is_empty() {
            messages.push(text.to_string());
        }
        current = err.source();
    }
    if messages.is_empty() {
        "template rendering failed".to_string()
    } else {
        messages.join(": ")
    }
}

/// Closest declared alias within edit distance 2, for typo suggestions.
fn closest_alias<'a>(
    target: &str,
    declared: impl Iterator<Item = &'a String>,
) -> Option<String> {
    declared
        .map(|candidate| (strsim::levenshtein(target, candidate), candidate))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.clone())
}
