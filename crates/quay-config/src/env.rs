//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they are only applied to fields
//! that no config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

#[derive(Clone, Copy)]
enum FieldKind {
    Str,
    Bool,
    Int,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "QUAY_APPLICATIONS_ROOT",
        field_path: "server.applications_root",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "QUAY_DEPLOY_DIR",
        field_path: "server.deploy_dir",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "QUAY_WATCH",
        field_path: "server.watch",
        kind: FieldKind::Bool,
    },
    EnvMapping {
        var_name: "QUAY_WATCH_DEBOUNCE_MS",
        field_path: "server.watch_debounce_ms",
        kind: FieldKind::Int,
    },
    EnvMapping {
        var_name: "QUAY_ENCODING",
        field_path: "application.encoding",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "QUAY_DEFAULT_LOCALE",
        field_path: "application.default_locale",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "QUAY_DIAGNOSTICS",
        field_path: "application.diagnostics",
        kind: FieldKind::Bool,
    },
    EnvMapping {
        var_name: "QUAY_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::Str,
    },
    EnvMapping {
        var_name: "QUAY_LOG_FORMAT",
        field_path: "logging.format",
        kind: FieldKind::Str,
    },
];

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer.
///
/// Returns the number of env vars applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a boolean or integer variable does
/// not parse.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults)
        {
            continue;
        }

        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );

        let value = coerce(mapping, raw)?;
        set_field(merged, mapping.field_path, value);
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    Ok(count)
}

fn coerce(mapping: &EnvMapping, raw: &str) -> ConfigResult<toml::Value> {
    match mapping.kind {
        FieldKind::Str => Ok(toml::Value::String(raw.to_owned())),
        FieldKind::Bool => raw
            .parse::<bool>()
            .map(toml::Value::Boolean)
            .map_err(|_| ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected true or false, got '{raw}'"),
            }),
        FieldKind::Int => raw
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected an integer, got '{raw}'"),
            }),
    }
}

/// Set a dotted field in the TOML tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
