//! Quay Loader - per-module isolation contexts.
//!
//! Each deployed module gets a [`ModuleLoader`] that resolves symbols and
//! resources from the module's own locations first and consults a shared,
//! host-owned parent only on a miss. Locations are discovered by scanning
//! the module's code directories with [`build_locations`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use quay_loader::{LocationResolver, Resolver, create_loader};
//!
//! # fn main() -> Result<(), quay_loader::LoaderError> {
//! let host: Arc<dyn Resolver> =
//!     Arc::new(LocationResolver::from_roots("host", &[PathBuf::from("/srv/shared")]));
//! let loader = create_loader("shop", &[PathBuf::from("/srv/apps/shop/lib")], host);
//! let artifact = loader.resolve("shop::handlers::Home")?;
//! println!("{} from {}", artifact.symbol, artifact.defined_by);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod artifact;
mod error;
mod factory;
mod isolation;
mod location;
mod resolver;

pub use artifact::{
    ARTIFACT_EXTENSION, Artifact, Resource, ResourceSource, SYMBOL_SEPARATOR, artifact_path,
    resource_path,
};
pub use error::{LoaderError, LoaderResult};
pub use factory::create_loader;
pub use isolation::ModuleLoader;
pub use location::{LoadableLocationSet, Location, LocationKind, build_locations};
pub use resolver::{LocationResolver, Resolver};
