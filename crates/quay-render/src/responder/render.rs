//! Renders templates against the merged request model.
//!
//! Model precedence, lowest first: `app`, `errors`, `request`, `session`,
//! `messages`, bean parameters, result attributes.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{Responder, apply_result_metadata, bound, emit_session_cookie, wrong_kind};
use crate::context::AppContext;
use crate::error::{RenderError, RenderResult};
use crate::exchange::{Body, Exchange};
use crate::result::{Render, ResultKind, ResultValue};
use crate::template::TemplateRequest;

/// Status code of the diagnostic page sent when a template fails.
pub const TEMPLATE_FAILURE_STATUS: u16 = 500;

/// Renders a template through the application's template engine.
///
/// Template failures do not propagate: they become a status-500 HTML page,
/// with the engine's trace included only in diagnostics mode.
#[derive(Debug, Default)]
pub struct RenderResponder {
    context: Option<Arc<AppContext>>,
}

impl RenderResponder {
    /// Create an uninitialized responder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Responder for RenderResponder {
    fn kind(&self) -> ResultKind {
        ResultKind::Render
    }

    fn init(&mut self, context: &Arc<AppContext>) -> RenderResult<()> {
        self.context = Some(Arc::clone(context));
        Ok(())
    }

    fn destroy(&mut self) {
        self.context = None;
    }

    fn respond(&self, result: &ResultValue, exchange: &mut Exchange) -> RenderResult<()> {
        let context = bound(self.context.as_ref(), ResultKind::Render)?;
        let ResultValue::Render(render) = result else {
            return Err(wrong_kind(ResultKind::Render, result));
        };
        if render.template.is_empty() {
            return Err(RenderError::IllegalArgument("template id is empty".into()));
        }

        let locale = exchange
            .session
            .locale
            .clone()
            .unwrap_or_else(|| context.default_locale.clone());
        let model = build_model(context, render, exchange, &locale);

        let output = context.templates.render(&TemplateRequest {
            template: &render.template,
            model: &model,
            locale: &locale,
            cache: context.template_cache,
        });

        match output {
            Ok(output) => {
                let content_type = match output.content_type {
                    Some(declared) => with_charset(&declared, &context.encoding),
                    None => format!("text/html; charset={}", context.encoding),
                };
                debug!(app = %context.name, template = %render.template, "Rendered template");

                exchange.response.headers.set("Content-Type", content_type);
                exchange.response.body = Body::Bytes(output.body.into_bytes());
                emit_session_cookie(context, exchange);
                apply_result_metadata(result, exchange);
                exchange.session.clear_errors();
            },
            Err(e) => {
                warn!(
                    app = %context.name,
                    template = %render.template,
                    error = %e,
                    "Template failed, sending diagnostic page"
                );
                exchange.response.status = TEMPLATE_FAILURE_STATUS;
                exchange.response.headers.set(
                    "Content-Type",
                    format!("text/html; charset={}", context.encoding),
                );
                let page = failure_page(&render.template, &e, context.diagnostics);
                exchange.response.body = Body::Bytes(page.into_bytes());
            },
        }
        Ok(())
    }
}

/// Assemble the template model. Later inserts shadow earlier ones: context
/// entries first, then beans, then the result's own attributes.
fn build_model(
    context: &AppContext,
    render: &Render,
    exchange: &Exchange,
    locale: &str,
) -> Map<String, Value> {
    let mut model = Map::new();
    model.insert("app".into(), context.to_model());
    if !exchange.session.errors.is_empty() {
        model.insert(
            "errors".into(),
            Value::from(exchange.session.errors.clone()),
        );
    }
    if let Ok(request) = serde_json::to_value(&exchange.request) {
        model.insert("request".into(), request);
    }
    if let Ok(session) = serde_json::to_value(&exchange.session) {
        model.insert("session".into(), session);
    }
    if let Some(messages) = context.messages_model(locale) {
        model.insert("messages".into(), Value::Object(messages));
    }

    for (name, value) in &exchange.beans {
        model.insert(name.clone(), value.clone());
    }
    for (name, value) in &render.attributes {
        model.insert(name.clone(), value.clone());
    }
    model
}

/// Append `charset` to a declared content type unless it names one.
fn with_charset(content_type: &str, encoding: &str) -> String {
    if content_type.to_ascii_lowercase().contains("charset=") {
        content_type.to_owned()
    } else {
        format!("{content_type}; charset={encoding}")
    }
}

fn failure_page(template: &str, error: &RenderError, diagnostics: bool) -> String {
    let (message, trace) = match error {
        RenderError::Template { message, trace, .. } => (message.clone(), trace.clone()),
        other => (other.to_string(), None),
    };

    let mut page = format!(
        "<!DOCTYPE html>\n<html><head><title>Template error</title></head><body>\n\
         <h1>Template error</h1>\n<p>Template <code>{}</code> could not be rendered.</p>\n",
        escape_html(template)
    );
    if diagnostics {
        page.push_str(&format!("<p>{}</p>\n", escape_html(&message)));
        if let Some(trace) = trace {
            page.push_str(&format!("<pre>{}</pre>\n", escape_html(&trace)));
        }
    }
    page.push_str("</body></html>\n");
    page
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
