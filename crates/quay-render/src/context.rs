//! Per-application context handed to responders at init.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use quay_config::ApplicationSection;
use serde_json::{Map, Value, json};

use crate::messages::MessageSource;
use crate::template::TemplateEngine;

/// Shared configuration of one deployed application.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Module name.
    pub name: String,
    /// Module root directory.
    pub root: PathBuf,
    /// Absolute public base directory.
    pub public_dir: PathBuf,
    /// Absolute private base directory.
    pub private_dir: PathBuf,
    /// Character encoding for text responses.
    pub encoding: String,
    /// Locale used when the session has none.
    pub default_locale: String,
    /// Let the template engine reuse compiled templates.
    pub template_cache: bool,
    /// Include trace text in error pages.
    pub diagnostics: bool,
    /// Name of the session cookie.
    pub session_cookie: String,
    /// The application's template engine.
    pub templates: Arc<dyn TemplateEngine>,
    /// The application's message bundles, if it ships any.
    pub messages: Option<Arc<MessageSource>>,
}

impl AppContext {
    /// Build the context for module `name` rooted at `root`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        settings: &ApplicationSection,
        templates: Arc<dyn TemplateEngine>,
    ) -> Self {
        let root = root.into();
        Self {
            name: name.into(),
            public_dir: root.join(&settings.public_dir),
            private_dir: root.join(&settings.private_dir),
            root,
            encoding: settings.encoding.clone(),
            default_locale: settings.default_locale.clone(),
            template_cache: settings.template_cache,
            diagnostics: settings.diagnostics,
            session_cookie: settings.session_cookie.clone(),
            templates,
            messages: None,
        }
    }

    /// Attach message bundles.
    #[must_use]
    pub fn with_messages(mut self, messages: Arc<MessageSource>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Enable or disable diagnostics mode.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Module root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `app` entry of the template model.
    #[must_use]
    pub fn to_model(&self) -> Value {
        json!({
            "name": self.name,
            "encoding": self.encoding,
            "default_locale": self.default_locale,
        })
    }

    /// The `messages` entry of the template model for `locale`.
    #[must_use]
    pub fn messages_model(&self, locale: &str) -> Option<Map<String, Value>> {
        self.messages.as_ref().map(|m| m.bundle_for(locale))
    }
}
