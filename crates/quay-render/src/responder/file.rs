//! Streams files from an application's public or private storage area.

use std::sync::Arc;

use tracing::debug;

use super::{
    Responder, apply_result_metadata, bound, emit_session_cookie, resolve_under, wrong_kind,
};
use crate::context::AppContext;
use crate::error::{RenderError, RenderResult};
use crate::exchange::{Body, Exchange};
use crate::result::{ResultKind, ResultValue, StorageArea};

/// Sends a file from the application's public or private directory.
///
/// The response is only touched once the file has been found, so a miss
/// leaves headers exactly as they were.
#[derive(Debug, Default)]
pub struct FileResponder {
    context: Option<Arc<AppContext>>,
}

impl FileResponder {
    /// Create an uninitialized responder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Responder for FileResponder {
    fn kind(&self) -> ResultKind {
        ResultKind::File
    }

    fn init(&mut self, context: &Arc<AppContext>) -> RenderResult<()> {
        self.context = Some(Arc::clone(context));
        Ok(())
    }

    fn destroy(&mut self) {
        self.context = None;
    }

    fn respond(&self, result: &ResultValue, exchange: &mut Exchange) -> RenderResult<()> {
        let context = bound(self.context.as_ref(), ResultKind::File)?;
        let ResultValue::File(file) = result else {
            return Err(wrong_kind(ResultKind::File, result));
        };

        let base = match file.area {
            StorageArea::Public => &context.public_dir,
            StorageArea::Private => &context.private_dir,
        };
        let resolved = resolve_under(base, &file.path)
            .filter(|p| p.is_file())
            .ok_or_else(|| RenderError::NotFound(file.path.display().to_string()))?;

        let file_name = resolved
            .file_name()
            .map(|n| n.to_string_lossy().replace('"', ""))
            .unwrap_or_default();
        debug!(app = %context.name, path = %resolved.display(), "Sending file");

        exchange.response.headers.set(
            "Content-Disposition",
            format!("attachment; filename=\"{file_name}\""),
        );
        exchange.response.body = Body::File(resolved);
        emit_session_cookie(context, exchange);
        apply_result_metadata(result, exchange);
        Ok(())
    }
}
