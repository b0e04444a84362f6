//! The resolver seam and its location-backed implementation.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::artifact::{Artifact, Resource, ResourceSource, artifact_path, resource_path};
use crate::error::{LoaderError, LoaderResult};
use crate::location::{Location, LocationKind, build_locations};

/// Resolves symbols to artifacts and names to resources.
///
/// `find_*` report a miss as `Ok(None)`; `resolve` and `resource` turn a
/// miss into [`LoaderError::NotFound`] scoped to this resolver.
pub trait Resolver: Send + Sync + fmt::Debug {
    /// Name of the scope this resolver serves (a module name, or `host`).
    fn scope(&self) -> &str;

    /// Look up the artifact for `symbol`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup cannot proceed. Location-backed
    /// resolvers skip locations they cannot read instead.
    fn find_artifact(&self, symbol: &str) -> LoaderResult<Option<Arc<Artifact>>>;

    /// Look up the resource called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup cannot proceed.
    fn find_resource(&self, name: &str) -> LoaderResult<Option<Resource>>;

    /// Resolve `symbol` or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::NotFound`] on a miss, or any read failure.
    fn resolve(&self, symbol: &str) -> LoaderResult<Arc<Artifact>> {
        self.find_artifact(symbol)?
            .ok_or_else(|| LoaderError::NotFound {
                scope: self.scope().to_owned(),
                name: symbol.to_owned(),
            })
    }

    /// Resolve resource `name` or fail with `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::NotFound`] on a miss, or any read failure.
    fn resource(&self, name: &str) -> LoaderResult<Resource> {
        self.find_resource(name)?
            .ok_or_else(|| LoaderError::NotFound {
                scope: self.scope().to_owned(),
                name: name.to_owned(),
            })
    }
}

/// A resolver that searches only its own ordered locations.
///
/// Used directly as the host's shared parent, and as the "own" half of every
/// [`ModuleLoader`](crate::ModuleLoader).
pub struct LocationResolver {
    scope: String,
    locations: Vec<Location>,
}

impl LocationResolver {
    /// Create a resolver over an already built location list.
    #[must_use]
    pub fn new(scope: impl Into<String>, locations: Vec<Location>) -> Self {
        Self {
            scope: scope.into(),
            locations,
        }
    }

    /// Scan `roots` and create a resolver over the result.
    #[must_use]
    pub fn from_roots(scope: impl Into<String>, roots: &[PathBuf]) -> Self {
        Self::new(scope, build_locations(roots).into_locations())
    }

    /// The ordered locations searched.
    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Find a location that is itself addressed by `name`: a directory or
    /// bundle whose path ends with the requested name.
    #[must_use]
    pub fn find_location(&self, name: &str) -> Option<Resource> {
        let relative = resource_path(name)?;
        self.locations
            .iter()
            .find(|l| l.is_named(&relative))
            .map(|l| Resource {
                name: name.to_owned(),
                defined_by: self.scope.clone(),
                source: ResourceSource::Path(l.path().to_path_buf()),
            })
    }
}

impl fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationResolver")
            .field("scope", &self.scope)
            .field("locations", &self.locations.len())
            .finish()
    }
}

impl Resolver for LocationResolver {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn find_artifact(&self, symbol: &str) -> LoaderResult<Option<Arc<Artifact>>> {
        let Some(relative) = artifact_path(symbol) else {
            return Ok(None);
        };

        for location in &self.locations {
            let bytes = match location.read(&relative) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(
                        scope = %self.scope,
                        location = %location.path().display(),
                        error = %e,
                        "Skipping unreadable location"
                    );
                    continue;
                },
            };
            if let Some(bytes) = bytes {
                return Ok(Some(Arc::new(Artifact::new(
                    symbol,
                    &self.scope,
                    location.path().to_path_buf(),
                    bytes,
                ))));
            }
        }
        Ok(None)
    }

    fn find_resource(&self, name: &str) -> LoaderResult<Option<Resource>> {
        let Some(relative) = resource_path(name) else {
            return Ok(None);
        };

        for location in &self.locations {
            let source = if location.kind() == LocationKind::Bundle {
                match location.read(&relative) {
                    Ok(data) => data.map(|data| ResourceSource::Bundled {
                        bundle: location.path().to_path_buf(),
                        data,
                    }),
                    Err(e) => {
                        debug!(
                            scope = %self.scope,
                            location = %location.path().display(),
                            error = %e,
                            "Skipping unreadable location"
                        );
                        continue;
                    },
                }
            } else {
                location.locate(&relative).map(ResourceSource::Path)
            };

            if let Some(source) = source {
                return Ok(Some(Resource {
                    name: name.to_owned(),
                    defined_by: self.scope.clone(),
                    source,
                }));
            }
        }
        Ok(None)
    }
}
