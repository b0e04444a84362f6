//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use std::path::{Component, Path};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Accepted range for `server.watch_debounce_ms`.
const DEBOUNCE_RANGE_MS: std::ops::RangeInclusive<u64> = 10..=60_000;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_server(config)?;
    validate_application(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> ConfigResult<()> {
    let s = &config.server;

    if s.applications_root.as_os_str().is_empty() {
        return Err(invalid("server.applications_root", "must not be empty"));
    }

    if !DEBOUNCE_RANGE_MS.contains(&s.watch_debounce_ms) {
        return Err(invalid(
            "server.watch_debounce_ms",
            &format!(
                "{} is out of range; must be between {} and {}",
                s.watch_debounce_ms,
                DEBOUNCE_RANGE_MS.start(),
                DEBOUNCE_RANGE_MS.end()
            ),
        ));
    }

    if s.watch && s.deploy_dir.is_none() {
        return Err(invalid("server.watch", "requires server.deploy_dir to be set"));
    }

    for dir in &s.code_dirs {
        require_module_relative("server.code_dirs", dir)?;
    }

    Ok(())
}

fn validate_application(config: &Config) -> ConfigResult<()> {
    let a = &config.application;

    require_module_relative("application.public_dir", &a.public_dir)?;
    require_module_relative("application.private_dir", &a.private_dir)?;

    if a.encoding.trim().is_empty() {
        return Err(invalid("application.encoding", "must not be empty"));
    }
    if a.default_locale.trim().is_empty() {
        return Err(invalid("application.default_locale", "must not be empty"));
    }
    if a.session_cookie.is_empty()
        || !a
            .session_cookie
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid(
            "application.session_cookie",
            "must be a non-empty token of ASCII letters, digits, '_' or '-'",
        ));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !LOG_LEVELS.contains(&l.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            &format!("unknown level '{}'; expected one of: {}", l.level, LOG_LEVELS.join(", ")),
        ));
    }
    if !LOG_FORMATS.contains(&l.format.as_str()) {
        return Err(invalid(
            "logging.format",
            &format!(
                "unknown format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }

    Ok(())
}

/// A module-relative directory: relative, non-empty, no `..`.
fn require_module_relative(field: &str, path: &Path) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(invalid(
            field,
            &format!("'{}' must be relative to the module directory", path.display()),
        ));
    }
    Ok(())
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.to_owned(),
    }
}
