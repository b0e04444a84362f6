//! Redirect responses.

use std::sync::Arc;

use super::{Responder, apply_result_metadata, bound, wrong_kind};
use crate::context::AppContext;
use crate::error::{RenderError, RenderResult};
use crate::exchange::{Body, Exchange};
use crate::result::{ResultKind, ResultValue};

/// Status code sent for redirects.
pub const REDIRECT_STATUS: u16 = 302;

/// Answers with a `302 Found` pointing at the result's URL.
#[derive(Debug, Default)]
pub struct RedirectResponder {
    context: Option<Arc<AppContext>>,
}

impl RedirectResponder {
    /// Create an uninitialized responder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Responder for RedirectResponder {
    fn kind(&self) -> ResultKind {
        ResultKind::Redirect
    }

    fn init(&mut self, context: &Arc<AppContext>) -> RenderResult<()> {
        self.context = Some(Arc::clone(context));
        Ok(())
    }

    fn destroy(&mut self) {
        self.context = None;
    }

    fn respond(&self, result: &ResultValue, exchange: &mut Exchange) -> RenderResult<()> {
        bound(self.context.as_ref(), ResultKind::Redirect)?;
        let ResultValue::Redirect(redirect) = result else {
            return Err(wrong_kind(ResultKind::Redirect, result));
        };
        if redirect.url.is_empty() {
            return Err(RenderError::IllegalArgument("redirect URL is empty".into()));
        }

        exchange.response.status = REDIRECT_STATUS;
        exchange.response.headers.set("Location", redirect.url.clone());
        exchange.response.body = Body::Empty;
        apply_result_metadata(result, exchange);
        Ok(())
    }
}
