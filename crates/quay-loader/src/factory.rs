//! Builds isolation contexts from filesystem roots.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::isolation::ModuleLoader;
use crate::location::build_locations;
use crate::resolver::Resolver;

/// Scan `roots` and build a [`ModuleLoader`] for `scope` that falls back to
/// `parent`.
///
/// Runs entirely with the caller's privileges; nothing here changes process
/// credentials or permissions.
#[must_use]
pub fn create_loader(
    scope: impl Into<String>,
    roots: &[PathBuf],
    parent: Arc<dyn Resolver>,
) -> ModuleLoader {
    let scope = scope.into();
    let locations = build_locations(roots).into_locations();
    info!(
        scope = %scope,
        roots = roots.len(),
        locations = locations.len(),
        parent = %parent.scope(),
        "Created module loader"
    );
    ModuleLoader::new(scope, locations, parent)
}
