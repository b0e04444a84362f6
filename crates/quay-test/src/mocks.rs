//! Mock implementations for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use quay_render::{RenderError, RenderResult, TemplateEngine, TemplateOutput, TemplateRequest};
use serde_json::{Map, Value};

/// One call observed by [`MockTemplateEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    /// Template id that was rendered.
    pub template: String,
    /// Locale the render ran under.
    pub locale: String,
    /// Model handed to the engine.
    pub model: Map<String, Value>,
    /// Whether compiled-template caching was requested.
    pub cache: bool,
}

#[derive(Debug, Default)]
struct MockState {
    bodies: HashMap<String, String>,
    content_types: HashMap<String, String>,
    failures: HashMap<String, (String, Option<String>)>,
    calls: Vec<RenderCall>,
}

/// Mock implementation of the `TemplateEngine` trait.
///
/// A template's body is its configured text with every `{{key}}` replaced by
/// the model value under `key`; unconfigured templates render as
/// `template:<id>`. Clones share state, so a test can keep one handle while
/// the host owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTemplateEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockTemplateEngine {
    /// Create a new mock engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source text of `template`.
    #[must_use]
    pub fn with_body(self, template: impl Into<String>, body: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.bodies.insert(template.into(), body.into());
        }
        self
    }

    /// Make `template` declare its own content type.
    #[must_use]
    pub fn with_content_type(
        self,
        template: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state
                .content_types
                .insert(template.into(), content_type.into());
        }
        self
    }

    /// Make `template` fail with `message` and an optional trace.
    #[must_use]
    pub fn failing(
        self,
        template: impl Into<String>,
        message: impl Into<String>,
        trace: Option<&str>,
    ) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state
                .failures
                .insert(template.into(), (message.into(), trace.map(str::to_owned)));
        }
        self
    }

    /// Every render call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RenderCall> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    /// The most recent render call.
    #[must_use]
    pub fn last_call(&self) -> Option<RenderCall> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.calls.last().cloned())
    }

    /// Number of render calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state.lock().map(|state| state.calls.len()).unwrap_or(0)
    }
}

impl TemplateEngine for MockTemplateEngine {
    fn render(&self, request: &TemplateRequest<'_>) -> RenderResult<TemplateOutput> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| RenderError::IllegalArgument("mock engine poisoned".into()))?;
        state.calls.push(RenderCall {
            template: request.template.to_owned(),
            locale: request.locale.to_owned(),
            model: request.model.clone(),
            cache: request.cache,
        });

        if let Some((message, trace)) = state.failures.get(request.template) {
            return Err(RenderError::Template {
                template: request.template.to_owned(),
                message: message.clone(),
                trace: trace.clone(),
            });
        }

        let source = state
            .bodies
            .get(request.template)
            .cloned()
            .unwrap_or_else(|| format!("template:{}", request.template));
        let output = TemplateOutput::new(substitute(&source, request.model));
        Ok(match state.content_types.get(request.template) {
            Some(content_type) => output.with_content_type(content_type.clone()),
            None => output,
        })
    }
}

fn substitute(source: &str, model: &Map<String, Value>) -> String {
    let mut out = source.to_owned();
    for (key, value) in model {
        let placeholder = format!("{{{{{key}}}}}");
        if !out.contains(&placeholder) {
            continue;
        }
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out = out.replace(&placeholder, &text);
    }
    out
}
