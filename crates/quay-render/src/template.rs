//! The seam to the external template engine.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::RenderResult;

/// Everything the engine needs to render one template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateRequest<'a> {
    /// Application-scoped template identifier.
    pub template: &'a str,
    /// Merged attribute model.
    pub model: &'a Map<String, Value>,
    /// Resolved locale.
    pub locale: &'a str,
    /// Whether the engine may reuse compiled templates.
    pub cache: bool,
}

/// Rendered template output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateOutput {
    /// Rendered body.
    pub body: String,
    /// Content type the template declared for itself, if any.
    pub content_type: Option<String>,
}

impl TemplateOutput {
    /// Output with no declared content type.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
        }
    }

    /// Declare a content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A template engine scoped to one application.
///
/// Implementations report failures as
/// [`RenderError::Template`](crate::RenderError::Template).
pub trait TemplateEngine: Send + Sync + fmt::Debug {
    /// Render a template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is missing or fails to execute.
    fn render(&self, request: &TemplateRequest<'_>) -> RenderResult<TemplateOutput>;
}
