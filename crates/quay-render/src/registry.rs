//! Result kind to responder dispatch table.
//!
//! One registry exists per application. It is built from a fixed table at
//! startup, initialized with the application's context, and destroyed with
//! the application. Dispatch is a plain lookup on the result's kind tag.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::AppContext;
use crate::error::{RenderError, RenderResult};
use crate::exchange::Exchange;
use crate::responder::{FileResponder, RedirectResponder, RenderResponder, Responder};
use crate::result::{ResultKind, ResultValue};

/// Maps each result kind to its responder.
#[derive(Default)]
pub struct ResponderRegistry {
    responders: HashMap<ResultKind, Box<dyn Responder>>,
    context: Option<Arc<AppContext>>,
}

impl ResponderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in responder for every kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RedirectResponder::new()));
        registry.register(Box::new(RenderResponder::new()));
        registry.register(Box::new(FileResponder::new()));
        registry
    }

    /// Register `responder` for its kind, returning any responder it
    /// replaces.
    pub fn register(&mut self, responder: Box<dyn Responder>) -> Option<Box<dyn Responder>> {
        self.responders.insert(responder.kind(), responder)
    }

    /// Whether a responder is registered for `kind`.
    #[must_use]
    pub fn handles(&self, kind: ResultKind) -> bool {
        self.responders.contains_key(&kind)
    }

    /// Whether `init` has run and `destroy` has not.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// The bound application context.
    #[must_use]
    pub fn context(&self) -> Option<&Arc<AppContext>> {
        self.context.as_ref()
    }

    /// Initialize every responder with `context`.
    ///
    /// # Errors
    ///
    /// Returns the first responder init failure. Responders initialized
    /// before it are destroyed again.
    pub fn init(&mut self, context: Arc<AppContext>) -> RenderResult<()> {
        let mut done: Vec<ResultKind> = Vec::new();
        for kind in ResultKind::ALL {
            let Some(responder) = self.responders.get_mut(&kind) else {
                continue;
            };
            if let Err(e) = responder.init(&context) {
                for kind in &done {
                    if let Some(responder) = self.responders.get_mut(kind) {
                        responder.destroy();
                    }
                }
                return Err(e);
            }
            done.push(kind);
        }

        info!(app = %context.name, responders = done.len(), "Initialized responders");
        self.context = Some(context);
        Ok(())
    }

    /// Destroy every responder and release the context.
    pub fn destroy(&mut self) {
        for responder in self.responders.values_mut() {
            responder.destroy();
        }
        if let Some(context) = self.context.take() {
            debug!(app = %context.name, "Destroyed responders");
        }
    }

    /// Render `result` with the responder for its kind.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::IllegalArgument`] if the registry is not
    /// initialized or has no responder for the result's kind, and otherwise
    /// whatever the responder returns.
    pub fn dispatch(&self, result: &ResultValue, exchange: &mut Exchange) -> RenderResult<()> {
        if self.context.is_none() {
            return Err(RenderError::IllegalArgument(
                "responder registry is not initialized".into(),
            ));
        }
        let kind = result.kind();
        let responder = self.responders.get(&kind).ok_or_else(|| {
            RenderError::IllegalArgument(format!("no responder for {kind} results"))
        })?;
        responder.respond(result, exchange)
    }
}

impl std::fmt::Debug for ResponderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.responders.keys().map(ToString::to_string).collect();
        kinds.sort();
        f.debug_struct("ResponderRegistry")
            .field("kinds", &kinds)
            .field("initialized", &self.context.is_some())
            .finish()
    }
}
