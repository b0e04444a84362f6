//! Per-module isolation context with self-first resolution.
//!
//! A [`ModuleLoader`] owns the module's locations and holds a shared
//! reference to exactly one parent. Every lookup walks the explicit attempt
//! list returned by [`ModuleLoader::chain`]: the module's own locations
//! first, the parent only on a miss. A module that bundles its own copy of a
//! shared artifact therefore always observes its own copy.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::artifact::{Artifact, Resource};
use crate::error::LoaderResult;
use crate::location::Location;
use crate::resolver::{LocationResolver, Resolver};

/// Self-first resolver scoping one module.
pub struct ModuleLoader {
    own: LocationResolver,
    parent: Arc<dyn Resolver>,
    artifacts: DashMap<String, Arc<Artifact>>,
}

impl ModuleLoader {
    /// Create a loader over `locations` that falls back to `parent`.
    #[must_use]
    pub fn new(
        scope: impl Into<String>,
        locations: Vec<Location>,
        parent: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            own: LocationResolver::new(scope, locations),
            parent,
            artifacts: DashMap::new(),
        }
    }

    /// The ordered attempt list: own locations, then the parent.
    #[must_use]
    pub fn chain(&self) -> [&dyn Resolver; 2] {
        [&self.own, self.parent.as_ref()]
    }

    /// The parent resolver.
    #[must_use]
    pub fn parent(&self) -> &Arc<dyn Resolver> {
        &self.parent
    }

    /// The module's own locations, in search order.
    #[must_use]
    pub fn locations(&self) -> &[Location] {
        self.own.locations()
    }

    /// Number of artifacts resolved and cached so far.
    #[must_use]
    pub fn cached_artifacts(&self) -> usize {
        self.artifacts.len()
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("scope", &self.own.scope())
            .field("locations", &self.own.locations().len())
            .field("parent", &self.parent.scope())
            .field("cached", &self.artifacts.len())
            .finish()
    }
}

impl Resolver for ModuleLoader {
    fn scope(&self) -> &str {
        self.own.scope()
    }

    fn find_artifact(&self, symbol: &str) -> LoaderResult<Option<Arc<Artifact>>> {
        if let Some(hit) = self.artifacts.get(symbol) {
            return Ok(Some(Arc::clone(hit.value())));
        }

        for resolver in self.chain() {
            if let Some(artifact) = resolver.find_artifact(symbol)? {
                trace!(
                    scope = %self.scope(),
                    symbol,
                    defined_by = %artifact.defined_by,
                    "Resolved artifact"
                );
                // Racing first resolutions keep whichever landed first.
                let cached = self
                    .artifacts
                    .entry(symbol.to_owned())
                    .or_insert(artifact)
                    .clone();
                return Ok(Some(cached));
            }
        }

        debug!(scope = %self.scope(), symbol, "Artifact not found");
        Ok(None)
    }

    fn find_resource(&self, name: &str) -> LoaderResult<Option<Resource>> {
        for resolver in self.chain() {
            if let Some(resource) = resolver.find_resource(name)? {
                return Ok(Some(resource));
            }
        }
        Ok(self.own.find_location(name))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::artifact::ResourceSource;
    use crate::error::LoaderError;
    use crate::location::build_locations;

    fn write(path: &Path, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    fn host(root: &Path) -> Arc<dyn Resolver> {
        Arc::new(LocationResolver::from_roots("host", &[root.to_path_buf()]))
    }

    fn module(scope: &str, root: &Path, parent: &Arc<dyn Resolver>) -> ModuleLoader {
        ModuleLoader::new(
            scope,
            build_locations(&[root]).into_locations(),
            Arc::clone(parent),
        )
    }

    #[test]
    fn test_own_version_wins_over_parent() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("host/util/Json.wasm"), b"host-json");
        write(&dir.path().join("a/util/Json.wasm"), b"a-json");

        let parent = host(&dir.path().join("host"));
        let loader = module("a", &dir.path().join("a"), &parent);

        let artifact = loader.resolve("util::Json").unwrap();
        assert_eq!(&*artifact.bytes, b"a-json");
        assert_eq!(artifact.defined_by, "a");
    }

    #[test]
    fn test_parent_only_symbol_resolves() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("host/util/Json.wasm"), b"host-json");
        std::fs::create_dir_all(dir.path().join("a")).unwrap();

        let parent = host(&dir.path().join("host"));
        let loader = module("a", &dir.path().join("a"), &parent);

        let artifact = loader.resolve("util::Json").unwrap();
        assert_eq!(artifact.defined_by, "host");
    }

    #[test]
    fn test_corrupt_own_bundle_falls_through_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("host/util/Json.wasm"), b"host-json");
        write(&dir.path().join("a/aaa.tgz"), b"not a tarball");

        let parent = host(&dir.path().join("host"));
        let loader = module("a", &dir.path().join("a"), &parent);

        let artifact = loader.resolve("util::Json").unwrap();
        assert_eq!(&*artifact.bytes, b"host-json");
        assert_eq!(artifact.defined_by, "host");
        assert!(matches!(
            loader.resolve("util::Missing"),
            Err(LoaderError::NotFound { .. })
        ));
    }

    #[test]
    fn test_siblings_do_not_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a/only/A.wasm"), b"a");
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::create_dir_all(dir.path().join("host")).unwrap();

        let parent = host(&dir.path().join("host"));
        let a = module("a", &dir.path().join("a"), &parent);
        let b = module("b", &dir.path().join("b"), &parent);

        assert!(a.resolve("only::A").is_ok());
        match b.resolve("only::A") {
            Err(LoaderError::NotFound { scope, .. }) => assert_eq!(scope, "b"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_repeat_resolution_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a/Main.wasm"), b"main");
        std::fs::create_dir_all(dir.path().join("host")).unwrap();

        let parent = host(&dir.path().join("host"));
        let loader = module("a", &dir.path().join("a"), &parent);

        let first = loader.resolve("Main").unwrap();
        let second = loader.resolve("Main").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.cached_artifacts(), 1);
    }

    #[test]
    fn test_concurrent_first_resolution() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a/Main.wasm"), b"main");
        std::fs::create_dir_all(dir.path().join("host")).unwrap();

        let parent = host(&dir.path().join("host"));
        let loader = Arc::new(module("a", &dir.path().join("a"), &parent));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loader = Arc::clone(&loader);
                std::thread::spawn(move || loader.resolve("Main").unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(results.iter().all(|r| r.bytes == results[0].bytes));
        assert_eq!(loader.cached_artifacts(), 1);
    }

    #[test]
    fn test_chain_order() {
        let dir = tempfile::tempdir().unwrap();
        let parent = host(dir.path());
        let loader = module("a", dir.path(), &parent);

        let scopes: Vec<_> = loader.chain().iter().map(|r| r.scope().to_owned()).collect();
        assert_eq!(scopes, vec!["a", "host"]);
    }

    #[test]
    fn test_resource_self_first_then_direct() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("host/static/site.css"), b"host");
        write(&dir.path().join("a/static/site.css"), b"a");
        std::fs::create_dir_all(dir.path().join("a/assets/img")).unwrap();

        let parent = host(&dir.path().join("host"));
        let loader = module("a", &dir.path().join("a"), &parent);

        let css = loader.resource("static/site.css").unwrap();
        assert_eq!(css.defined_by, "a");

        // Directory locations are reachable only through the direct search.
        let img = loader.resource("assets/img").unwrap();
        assert_eq!(
            img.source,
            ResourceSource::Path(dir.path().join("a/assets/img"))
        );

        assert!(matches!(
            loader.resource("nope.txt"),
            Err(LoaderError::NotFound { .. })
        ));
    }
}
