//! Shared fixtures for the integration suite.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing_subscriber::EnvFilter;
use weft::compose::Composer;
use weft::resolver::Resolver;

static INIT_LOGGING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`, once per process.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Write a unit file into the fixture directory and return its path.
pub fn write_unit(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Resolve an entry file without caching and load it into a fresh composer.
pub fn composer_for(entry: &Path) -> Composer {
    init_test_logging();
    let resolution = Resolver::without_cache()
        .resolve(entry)
        .expect("fixture entry should resolve");
    let mut composer = Composer::new();
    composer.load_graph(resolution);
    composer
}

/// A leaf component whose template renders a fixed body.
pub fn leaf_component(name: &str, body: &str) -> String {
    format!("[component]\nname = \"{name}\"\n\n[template]\ncontent = \"{body}\"\n")
}
