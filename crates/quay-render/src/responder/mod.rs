//! Responders turn a result value into response status, headers and body.

mod file;
mod redirect;
mod render;

pub use file::FileResponder;
pub use redirect::{REDIRECT_STATUS, RedirectResponder};
pub use render::{RenderResponder, TEMPLATE_FAILURE_STATUS};

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::{RenderError, RenderResult};
use crate::exchange::Exchange;
use crate::headers::Cookie;
use crate::result::{ResultKind, ResultValue};

/// Renders one kind of result for one application.
///
/// A responder is initialized with its application's context before the
/// first dispatch and destroyed with the application.
pub trait Responder: Send + Sync {
    /// The kind this responder renders.
    fn kind(&self) -> ResultKind;

    /// Bind the responder to its application.
    ///
    /// # Errors
    ///
    /// Returns an error if the context is unusable for this responder.
    fn init(&mut self, context: &Arc<AppContext>) -> RenderResult<()>;

    /// Release the application context.
    fn destroy(&mut self);

    /// Render `result` into `exchange.response`.
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be rendered.
    fn respond(&self, result: &ResultValue, exchange: &mut Exchange) -> RenderResult<()>;
}

/// The bound context, or an error if `init` has not run.
fn bound(context: Option<&Arc<AppContext>>, kind: ResultKind) -> RenderResult<&Arc<AppContext>> {
    context.ok_or_else(|| {
        RenderError::IllegalArgument(format!("{kind} responder is not initialized"))
    })
}

fn wrong_kind(expected: ResultKind, result: &ResultValue) -> RenderError {
    RenderError::IllegalArgument(format!(
        "{expected} responder cannot render a {} result",
        result.kind()
    ))
}

/// Copy the result's own headers and cookies onto the response.
fn apply_result_metadata(result: &ResultValue, exchange: &mut Exchange) {
    exchange.response.headers.extend_from(result.headers());
    exchange
        .response
        .cookies
        .extend(result.cookies().iter().cloned());
}

/// Emit the session cookie if the session was created by this request, then
/// clear the marker so it is sent at most once.
fn emit_session_cookie(context: &AppContext, exchange: &mut Exchange) {
    if !exchange.session.is_new() {
        return;
    }
    let cookie = Cookie::new(&context.session_cookie, exchange.session.id.to_string())
        .with_path("/")
        .http_only();
    exchange.response.cookies.push(cookie);
    exchange.session.mark_cookie_sent();
}

/// Lexically resolve `relative` under `base`. Absolute paths and `..` that
/// would climb above `base` yield `None`; the filesystem is not consulted.
fn resolve_under(base: &Path, relative: &Path) -> Option<PathBuf> {
    let mut resolved = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {},
            Component::ParentDir => {
                if resolved == base {
                    return None;
                }
                resolved.pop();
            },
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_under() {
        let base = Path::new("/srv/app/public");
        assert_eq!(
            resolve_under(base, Path::new("img/logo.png")).unwrap(),
            Path::new("/srv/app/public/img/logo.png")
        );
        assert_eq!(
            resolve_under(base, Path::new("img/../a.txt")).unwrap(),
            Path::new("/srv/app/public/a.txt")
        );
        assert!(resolve_under(base, Path::new("../private/key")).is_none());
        assert!(resolve_under(base, Path::new("/etc/passwd")).is_none());
    }
}
