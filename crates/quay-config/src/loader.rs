//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `/etc/quay/config.toml` (system)
//! 3. Merge `~/.quay/config.toml` (user)
//! 4. Merge the explicitly requested file, if any
//! 5. Apply `QUAY_*` env var fallbacks for fields no file set
//! 6. Deserialize merged tree → `Config`
//! 7. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A fully merged configuration plus where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Which layer set each dotted field path.
    pub field_sources: FieldSources,
    /// Files that contributed a layer, in merge order.
    pub loaded_files: Vec<String>,
}

/// Inputs to [`load`]. Every field is optional; the default loads system and
/// user layers from their standard locations.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file merged last (highest file precedence).
    pub explicit: Option<PathBuf>,
    /// Replaces the `~/.quay` directory used for the user layer.
    pub home_override: Option<PathBuf>,
    /// Skip `/etc/quay/config.toml`.
    pub skip_system: bool,
    /// Environment used for fallbacks. `None` reads the process environment.
    pub env: Option<HashMap<String, String>>,
}

/// Load the configuration with layered file precedence.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(options: &LoadOptions) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    let mut layers: Vec<(PathBuf, ConfigLayer)> = Vec::new();
    if !options.skip_system {
        layers.push((PathBuf::from("/etc/quay/config.toml"), ConfigLayer::System));
    }
    if let Some(user_dir) = options.home_override.clone().or_else(user_config_dir) {
        layers.push((user_dir.join("config.toml"), ConfigLayer::User));
    }

    for (path, layer) in layers {
        if let Some(overlay) = try_load_file(&path)? {
            deep_merge_tracking(&mut merged, &overlay, "", &layer, &mut field_sources);
            info!(path = %path.display(), layer = %layer, "loaded config layer");
            loaded_files.push(path.display().to_string());
        }
    }

    if let Some(path) = &options.explicit {
        // An explicitly requested file must exist.
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::Explicit,
            &mut field_sources,
        );
        info!(path = %path.display(), "loaded explicit config");
        loaded_files.push(path.display().to_string());
    }

    let env_vars = options.env.clone().unwrap_or_else(collect_env_vars);
    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, &env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering, no env).
///
/// Fields the file omits take their defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let value = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: path.display().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;

    let config: Config = value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read to avoid TOCTOU races between an existence check and
/// the read.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len(),
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

/// `~/.quay`, if a home directory can be determined.
fn user_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".quay"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isolated(home: &Path) -> LoadOptions {
        LoadOptions {
            home_override: Some(home.to_path_buf()),
            skip_system: true,
            env: Some(HashMap::new()),
            ..LoadOptions::default()
        }
    }

    #[test]
    fn defaults_load_without_any_files() {
        let home = tempfile::tempdir().unwrap();
        let resolved = load(&isolated(home.path())).unwrap();

        assert_eq!(resolved.config, Config::default());
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(
            resolved.field_sources.get("application.encoding"),
            Some(&ConfigLayer::Defaults)
        );
    }

    #[test]
    fn explicit_file_overrides_user_layer() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            "[application]\nencoding = \"ISO-8859-1\"\ndefault_locale = \"de\"\n",
        )
        .unwrap();
        let explicit = home.path().join("explicit.toml");
        std::fs::write(&explicit, "[application]\nencoding = \"UTF-16\"\n").unwrap();

        let mut options = isolated(home.path());
        options.explicit = Some(explicit);
        let resolved = load(&options).unwrap();

        assert_eq!(resolved.config.application.encoding, "UTF-16");
        assert_eq!(resolved.config.application.default_locale, "de");
        assert_eq!(resolved.loaded_files.len(), 2);
    }

    #[test]
    fn env_fallback_fills_default_fields() {
        let home = tempfile::tempdir().unwrap();
        let mut options = isolated(home.path());
        options.env = Some(HashMap::from([(
            "QUAY_APPLICATIONS_ROOT".to_owned(),
            "/srv/quay/apps".to_owned(),
        )]));

        let resolved = load(&options).unwrap();
        assert_eq!(
            resolved.config.server.applications_root,
            PathBuf::from("/srv/quay/apps")
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let mut options = isolated(home.path());
        options.explicit = Some(home.path().join("nope.toml"));

        assert!(matches!(load(&options), Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join("config.toml"), "[server\nwatch = ").unwrap();

        assert!(matches!(
            load(&isolated(home.path())),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn load_file_fills_omitted_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quay.toml");
        std::fs::write(&path, "[server]\ndeploy_dir = \"drop\"\nwatch = true\n").unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.server.deploy_dir, Some(PathBuf::from("drop")));
        assert!(config.server.watch);
        assert_eq!(config.application, crate::ApplicationSection::default());
    }
}
