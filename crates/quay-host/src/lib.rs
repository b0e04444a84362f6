//! Quay Host - the composition root of the Quay application host.
//!
//! A [`Host`] keeps one [`Application`] per deployed module. Each application
//! owns an isolation context whose parent is the host's shared resolver, an
//! application context, and a responder registry. Deploys, reloads and
//! undeploys swap entries in the module table; requests clone the entry out
//! of the table and dispatch against it.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use quay_host::{Host, SharedEngine};
//! use quay_render::{Exchange, Redirect, ResultValue, TemplateEngine};
//!
//! # fn run(engine: Arc<dyn TemplateEngine>) -> Result<(), quay_host::HostError> {
//! let host = Host::load(None, Arc::new(SharedEngine::new(engine)))?;
//! host.deploy(Path::new("drop/shop.sar"))?;
//!
//! let mut exchange = Exchange::default();
//! host.dispatch("shop", &ResultValue::from(Redirect::new("/cart")), &mut exchange)?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod application;
mod engine;
mod error;
mod host;
mod logging;

pub use application::Application;
pub use engine::{EngineFactory, SharedEngine};
pub use error::{HostError, HostResult};
pub use host::{HOST_SCOPE, Host};
pub use logging::init_logging;
