//! Shared helpers for unit and integration tests.

use std::path::Path;

use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Initialize logging for tests. Safe to call repeatedly; only the first
/// call installs a subscriber. Honors `RUST_LOG` unless `level` is given.
pub fn init_test_logging(level: Option<Level>) {
    let filter = level.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        |l| EnvFilter::new(l.to_string()),
    );
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// Materialize a fixture file tree in a temporary directory.
///
/// Each entry is a relative path and its content; parent directories are
/// created as needed. The returned guard removes the tree on drop.
///
/// # Panics
///
/// Panics on any IO failure; fixtures are test-only.
#[must_use]
pub fn fixture_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    for (path, content) in files {
        write_fixture(dir.path(), path, content);
    }
    dir
}

/// Write a single fixture file under `root`, creating parent directories.
pub fn write_fixture(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("failed to create fixture dirs");
    }
    std::fs::write(&path, content).expect("failed to write fixture file");
}
