//! Test fixtures for common types.

use std::path::Path;

use chrono::Utc;
use quay_config::Config;
use quay_render::{Exchange, Request, Session};
use uuid::Uuid;

/// Default configuration with modules unpacked under `applications_root`.
#[must_use]
pub fn test_config(applications_root: &Path) -> Config {
    let mut config = Config::default();
    config.server.applications_root = applications_root.to_path_buf();
    config.server.deploy_dir = None;
    config.server.shared_lib_dirs = Vec::new();
    config
}

/// [`test_config`] with a hot-deploy drop directory and watching enabled.
#[must_use]
pub fn test_config_with_drop(applications_root: &Path, drop_dir: &Path) -> Config {
    let mut config = test_config(applications_root);
    config.server.deploy_dir = Some(drop_dir.to_path_buf());
    config.server.watch = true;
    config.server.watch_debounce_ms = 50;
    config
}

/// A session created by the current request.
#[must_use]
pub fn new_session() -> Session {
    Session::new()
}

/// A session restored from an earlier request.
#[must_use]
pub fn returning_session() -> Session {
    Session::existing(Uuid::new_v4(), Utc::now())
}

/// A `GET /` exchange within a returning session.
#[must_use]
pub fn test_exchange() -> Exchange {
    Exchange::new(Request::new("GET", "/"), returning_session())
}

/// A `GET <path>` exchange within a fresh session.
#[must_use]
pub fn first_visit(path: &str) -> Exchange {
    Exchange::new(Request::new("GET", path), new_session())
}

/// Create `files` under `root`, making parent directories as needed.
///
/// # Panics
///
/// Panics if a file cannot be written.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent directory");
        }
        std::fs::write(&path, contents).expect("write file");
    }
}

/// Route `tracing` output through the test harness, honouring `RUST_LOG`.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
