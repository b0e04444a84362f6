//! Per-module template engine and message bundle provisioning.

use std::fmt;
use std::sync::Arc;

use quay_deploy::Module;
use quay_render::{MessageSource, TemplateEngine};

/// Supplies each deployed module with its template engine and messages.
///
/// Called once per deploy or reload, after the module is unpacked.
pub trait EngineFactory: Send + Sync + fmt::Debug {
    /// The template engine for `module`.
    fn template_engine(&self, module: &Module) -> Arc<dyn TemplateEngine>;

    /// Message bundles for `module`, if it has any.
    fn messages(&self, _module: &Module) -> Option<Arc<MessageSource>> {
        None
    }
}

/// Hands every module the same engine.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    engine: Arc<dyn TemplateEngine>,
    messages: Option<Arc<MessageSource>>,
}

impl SharedEngine {
    /// Share `engine` across all modules.
    #[must_use]
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self {
            engine,
            messages: None,
        }
    }

    /// Share `messages` across all modules as well.
    #[must_use]
    pub fn with_messages(mut self, messages: Arc<MessageSource>) -> Self {
        self.messages = Some(messages);
        self
    }
}

impl EngineFactory for SharedEngine {
    fn template_engine(&self, _module: &Module) -> Arc<dyn TemplateEngine> {
        Arc::clone(&self.engine)
    }

    fn messages(&self, _module: &Module) -> Option<Arc<MessageSource>> {
        self.messages.clone()
    }
}
