//! Host error types.

use quay_config::ConfigError;
use quay_deploy::DeployError;
use quay_loader::LoaderError;
use quay_render::RenderError;
use quay_telemetry::TelemetryError;
use thiserror::Error;

/// Errors surfaced by the host.
#[derive(Debug, Error)]
pub enum HostError {
    /// No module with this name is deployed.
    #[error("module not deployed: {0}")]
    ModuleNotFound(String),

    /// Symbol or resource resolution failed.
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// Installing or removing a module failed.
    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// A responder failed while serving a module.
    #[error("module {module}: {source}")]
    Render {
        /// Module whose responder failed.
        module: String,
        /// Underlying render failure.
        #[source]
        source: RenderError,
    },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging could not be set up.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

impl HostError {
    pub(crate) fn render(module: &str, source: RenderError) -> Self {
        Self::Render {
            module: module.to_owned(),
            source,
        }
    }
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;
