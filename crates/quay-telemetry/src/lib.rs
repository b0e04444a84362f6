//! Quay Telemetry - Logging and request tracing for the Quay host.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats
//! - Per-request trace context scoped to the module that serves it
//!
//! # Example
//!
//! ```rust,no_run
//! use quay_telemetry::{LogConfig, LogFormat, RequestTrace, setup_logging};
//!
//! # fn main() -> Result<(), quay_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("quay_loader=debug");
//! setup_logging(&config)?;
//!
//! let trace = RequestTrace::new("shop").with_operation("dispatch");
//! let _guard = trace.span().entered();
//! tracing::info!("serving request");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;
mod trace;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
pub use trace::RequestTrace;
