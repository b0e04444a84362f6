//! Per-request trace context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trace context for one request served by one module.
///
/// Failures inside the span are attributed to `module`, so a log reader can
/// tell which deployed application a resolution or render error belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTrace {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Name of the module serving the request.
    pub module: String,
    /// Operation being performed.
    pub operation: Option<String>,
    /// When the request started.
    pub started_at: DateTime<Utc>,
}

impl RequestTrace {
    /// Create a new trace for a request served by `module`.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            module: module.into(),
            operation: None,
            started_at: Utc::now(),
        }
    }

    /// Set the request ID, e.g. one propagated by the transport.
    #[must_use]
    pub fn with_request_id(mut self, id: Uuid) -> Self {
        self.request_id = id;
        self
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Get elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.started_at)
    }

    /// Get elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed().num_milliseconds()
    }

    /// Create a tracing span carrying this context.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            module = %self.module,
            operation = self.operation.as_deref(),
        )
    }

    /// Short identifier for log lines.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.simple().to_string().chars().take(8).collect()
    }
}
