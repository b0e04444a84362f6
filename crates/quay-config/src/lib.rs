#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration for the Quay application host.
//!
//! # Usage
//!
//! ```rust,no_run
//! use quay_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("modules live in {}", resolved.config.server.applications_root.display());
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Explicit file** passed by the caller
//! 2. **User** (`~/.quay/config.toml`)
//! 3. **System** (`/etc/quay/config.toml`)
//! 4. **Environment variables** (`QUAY_*`), fallback only
//! 5. **Embedded defaults** (`defaults.toml` compiled into the binary)

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with precedence.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{LoadOptions, ResolvedConfig};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(&LoadOptions {
            explicit: explicit.map(std::path::Path::to_path_buf),
            ..LoadOptions::default()
        })
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
