//! Shared test harness for integration tests.

use std::path::PathBuf;
use std::sync::Arc;

use quay_config::Config;
use quay_host::{Application, Host, SharedEngine};
use quay_test::{MockTemplateEngine, SarBuilder, test_config_with_drop, write_tree};
use tempfile::TempDir;

/// A host wired to a mock template engine inside a scratch directory.
///
/// Layout under the tempdir: `applications/` (module root), `drop/` (archive
/// drop directory) and `shared/` (the host's shared library root).
#[allow(dead_code)]
pub struct Harness {
    /// The host under test.
    pub host: Arc<Host>,
    /// Handle on the engine every module renders with.
    pub engine: MockTemplateEngine,
    /// Applications root.
    pub apps: PathBuf,
    /// Drop directory.
    pub drop: PathBuf,
    /// Held to keep the tempdir alive.
    _dir: TempDir,
}

#[allow(dead_code)]
impl Harness {
    /// A harness with no shared libraries and default settings.
    pub fn new() -> Self {
        Self::build(MockTemplateEngine::new(), &[], |_| {})
    }

    /// A harness whose shared library root holds `shared_files`.
    pub fn with_shared(shared_files: &[(&str, &str)]) -> Self {
        Self::build(MockTemplateEngine::new(), shared_files, |_| {})
    }

    /// A harness with custom engine behaviour and config tweaks.
    pub fn build(
        engine: MockTemplateEngine,
        shared_files: &[(&str, &str)],
        configure: impl FnOnce(&mut Config),
    ) -> Self {
        let dir = TempDir::new().expect("failed to create tempdir");
        let apps = dir.path().join("applications");
        let drop = dir.path().join("drop");
        let shared = dir.path().join("shared");
        std::fs::create_dir_all(&drop).expect("create drop dir");
        std::fs::create_dir_all(&shared).expect("create shared dir");
        write_tree(&shared, shared_files);

        let mut config = test_config_with_drop(&apps, &drop);
        config.server.shared_lib_dirs = vec![shared];
        configure(&mut config);

        let engines = SharedEngine::new(Arc::new(engine.clone()));
        let host = Arc::new(Host::new(config, Arc::new(engines)));
        Self {
            host,
            engine,
            apps,
            drop,
            _dir: dir,
        }
    }

    /// Write `archive` into the drop directory and deploy it.
    pub fn deploy(&self, archive: &SarBuilder) -> Arc<Application> {
        let path = archive.write_to(&self.drop);
        self.host.deploy(&path).expect("deploy archive")
    }
}
