//! Quay Render - results, result caching, and responder dispatch.
//!
//! Application code answers a request with a [`ResultValue`]: a redirect, a
//! template render, or a file download. Each application owns a
//! [`ResponderRegistry`] that routes the value to the responder for its kind.
//! Frequently used results can be shared through the host's
//! [`ResultCaches`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quay_render::{
//!     AppContext, Exchange, Render, RenderResult, ResponderRegistry, ResultValue, TemplateEngine,
//!     TemplateOutput, TemplateRequest,
//! };
//!
//! #[derive(Debug)]
//! struct Plain;
//!
//! impl TemplateEngine for Plain {
//!     fn render(&self, request: &TemplateRequest<'_>) -> RenderResult<TemplateOutput> {
//!         Ok(TemplateOutput::new(format!("<h1>{}</h1>", request.template)))
//!     }
//! }
//!
//! # fn main() -> RenderResult<()> {
//! let context = Arc::new(AppContext::new(
//!     "shop",
//!     "/srv/applications/shop",
//!     &quay_config::ApplicationSection::default(),
//!     Arc::new(Plain),
//! ));
//! let mut registry = ResponderRegistry::standard();
//! registry.init(context)?;
//!
//! let mut exchange = Exchange::default();
//! registry.dispatch(&ResultValue::from(Render::new("home")), &mut exchange)?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cache;
mod context;
mod error;
mod exchange;
mod headers;
mod messages;
mod registry;
mod responder;
mod result;
mod template;
#[cfg(test)]
mod testing;

pub use cache::{FromKey, ResultCache, ResultCaches};
pub use context::AppContext;
pub use error::{RenderError, RenderResult};
pub use exchange::{Body, Exchange, Request, Response, Session};
pub use headers::{Cookie, Headers};
pub use messages::{MessageFormat, MessageSource};
pub use registry::ResponderRegistry;
pub use responder::{
    FileResponder, REDIRECT_STATUS, RedirectResponder, RenderResponder, Responder,
    TEMPLATE_FAILURE_STATUS,
};
pub use result::{FileDownload, Redirect, Render, ResultKind, ResultValue, StorageArea};
pub use template::{TemplateEngine, TemplateOutput, TemplateRequest};
