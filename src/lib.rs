//! # weft
//!
//! Weft assembles final context payloads for AI tools out of small,
//! reusable template units. A unit is a TOML file of one of two kinds:
//! components (`*.component.toml`), reusable building blocks with a typed
//! prop contract, and workflows (`*.workflow.toml`), top-level aggregators.
//! Units declare dependencies on components through a `[uses]` map of alias
//! to relative path, and their `[template]` bodies invoke those aliases as
//! template functions whose keyword arguments become the dependency's
//! props.
//!
//! The crate is organized as a pipeline:
//!
//! - [`definition`] loads and validates unit files into shared
//!   [`definition::Definition`] values, reading through the [`cache`].
//! - [`resolver`] walks the dependency maps from an entry file into an
//!   acyclic [`resolver::DependencyGraph`] with a dependency-first order.
//! - [`compose`] renders a unit against the resolved graph, enforcing each
//!   component's prop contract at every invocation site and recursively
//!   substituting dependency output at call sites.
//! - [`provider`] is the boundary templates reach external capabilities
//!   through via `instruct(provider="...")`; the core ships none.
//! - [`core`] carries the error taxonomy everything above reports with.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use weft::compose::Composer;
//! use weft::resolver::Resolver;
//!
//! fn main() -> anyhow::Result<()> {
//!     let resolution = Resolver::new().resolve(Path::new("daily.workflow.toml"))?;
//!     let mut composer = Composer::new();
//!     composer.load_graph(resolution);
//!     let result = composer.render_root(serde_json::Map::new())?;
//!     println!("{}", result.content);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod compose;
pub mod core;
pub mod definition;
pub mod provider;
pub mod resolver;
