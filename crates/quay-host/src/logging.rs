//! Logging bootstrap from the `[logging]` config section.

use quay_config::Config;
use quay_telemetry::{LogConfig, setup_logging};

use crate::error::HostResult;

/// Install the global subscriber described by `config.logging`.
///
/// # Errors
///
/// Returns [`HostError::Telemetry`](crate::HostError::Telemetry) if the
/// section is invalid or a subscriber is already installed.
pub fn init_logging(config: &Config) -> HostResult<()> {
    let log_config = LogConfig::try_from(&config.logging)?;
    setup_logging(&log_config)?;
    Ok(())
}
