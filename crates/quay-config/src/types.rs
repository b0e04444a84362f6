//! Configuration types for the Quay host.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working
//! configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for the Quay host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host-wide settings: where modules live, shared libraries, hot deploy.
    pub server: ServerSection,
    /// Per-application defaults handed to every module's responders.
    pub application: ApplicationSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ServerSection
// ---------------------------------------------------------------------------

/// Host-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Directory that holds one unpacked directory per deployed module.
    pub applications_root: PathBuf,
    /// Drop directory scanned for `.sar` archives. Hot deploy is disabled
    /// when unset.
    pub deploy_dir: Option<PathBuf>,
    /// Roots of the host-owned shared libraries every module falls back to.
    pub shared_lib_dirs: Vec<PathBuf>,
    /// Module-relative directories scanned into a module's own locations.
    pub code_dirs: Vec<PathBuf>,
    /// Watch `deploy_dir` for new or changed archives.
    pub watch: bool,
    /// Debounce window for archive change events, in milliseconds.
    pub watch_debounce_ms: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            applications_root: PathBuf::from("applications"),
            deploy_dir: None,
            shared_lib_dirs: Vec::new(),
            code_dirs: vec![PathBuf::from("lib"), PathBuf::from("classes")],
            watch: false,
            watch_debounce_ms: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// ApplicationSection
// ---------------------------------------------------------------------------

/// Settings every deployed application reads through its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSection {
    /// Module-relative directory for publicly served files.
    pub public_dir: PathBuf,
    /// Module-relative directory for templates and private files.
    pub private_dir: PathBuf,
    /// Character encoding advertised in `Content-Type` headers.
    pub encoding: String,
    /// Locale used when the session does not carry one.
    pub default_locale: String,
    /// Let the template engine cache compiled templates.
    pub template_cache: bool,
    /// Development mode: include trace text in rendered error pages.
    pub diagnostics: bool,
    /// Name of the cookie carrying the session id.
    pub session_cookie: String,
}

impl Default for ApplicationSection {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("public"),
            private_dir: PathBuf::from("private"),
            encoding: "UTF-8".to_owned(),
            default_locale: "en".to_owned(),
            template_cache: true,
            diagnostics: false,
            session_cookie: "QUAYSESSION".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration as written in TOML.
///
/// Converted into `quay_telemetry::LogConfig` at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level filter (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format: `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// Extra `EnvFilter` directives such as `quay_loader=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
        }
    }
}
