//! Quay Deploy - archive installation and hot deploy.
//!
//! A deployment archive is a gzip-compressed tar named `<module>.sar`. The
//! [`Installer`] unpacks it into `<applications_root>/<module>` and swaps the
//! new tree in only once it is complete. The [`DeployWatcher`] watches a drop
//! directory and reports archives whose contents changed.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use quay_deploy::Installer;
//!
//! # fn main() -> Result<(), quay_deploy::DeployError> {
//! let module = Installer::new().install(Path::new("drop/shop.sar"), Path::new("applications"))?;
//! println!("{} installed at {}", module.name, module.root.display());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod archive;
mod error;
mod installer;
mod watcher;

pub use archive::{
    ARCHIVE_EXTENSION, DeploymentArchive, Module, digest_file, validate_module_name,
};
pub use error::{DeployError, DeployResult};
pub use installer::{COPY_BUFFER_SIZE, Installer, is_working_dir};
pub use watcher::{DEFAULT_DEBOUNCE, DeployEvent, DeployWatcher, WatcherConfig, scan_drop_dir};
