//! In-crate test helpers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use quay_config::ApplicationSection;
use serde_json::{Map, Value};

use crate::context::AppContext;
use crate::error::{RenderError, RenderResult};
use crate::template::{TemplateEngine, TemplateOutput, TemplateRequest};

/// Template engine whose behaviour per template id is set up front.
#[derive(Debug, Default)]
pub(crate) struct ScriptedEngine {
    content_types: HashMap<String, String>,
    failures: HashMap<String, (String, String)>,
    last: Mutex<Option<(Map<String, Value>, String)>>,
}

impl ScriptedEngine {
    pub(crate) fn with_content_type(mut self, template: &str, content_type: &str) -> Self {
        self.content_types
            .insert(template.to_owned(), content_type.to_owned());
        self
    }

    pub(crate) fn failing(mut self, template: &str, message: &str, trace: &str) -> Self {
        self.failures
            .insert(template.to_owned(), (message.to_owned(), trace.to_owned()));
        self
    }

    pub(crate) fn last_model(&self) -> Option<Map<String, Value>> {
        self.last.lock().unwrap().as_ref().map(|(m, _)| m.clone())
    }

    pub(crate) fn last_locale(&self) -> Option<String> {
        self.last.lock().unwrap().as_ref().map(|(_, l)| l.clone())
    }
}

impl TemplateEngine for ScriptedEngine {
    fn render(&self, request: &TemplateRequest<'_>) -> RenderResult<TemplateOutput> {
        *self.last.lock().unwrap() = Some((request.model.clone(), request.locale.to_owned()));

        if let Some((message, trace)) = self.failures.get(request.template) {
            return Err(RenderError::Template {
                template: request.template.to_owned(),
                message: message.clone(),
                trace: Some(trace.clone()),
            });
        }

        let output = TemplateOutput::new(format!("<p>{}</p>", request.template));
        Ok(match self.content_types.get(request.template) {
            Some(content_type) => output.with_content_type(content_type.clone()),
            None => output,
        })
    }
}

pub(crate) fn test_context_with(root: &Path, engine: Arc<dyn TemplateEngine>) -> Arc<AppContext> {
    Arc::new(AppContext::new(
        "test",
        root,
        &ApplicationSection::default(),
        engine,
    ))
}

pub(crate) fn test_context(root: &Path) -> Arc<AppContext> {
    test_context_with(root, Arc::new(ScriptedEngine::default()))
}
