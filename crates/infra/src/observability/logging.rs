//! Tracing subscriber setup
//!
//! `RUST_LOG` wins over the configured filter. Output goes to stderr, as
//! plain text or JSON lines.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use unical_domain::{LoggingConfig, Result, UnicalError};

/// Install the global subscriber.
///
/// # Errors
/// Returns `UnicalError::Config` for an invalid filter directive and
/// `UnicalError::Internal` when a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_current_span(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr).with_target(true)).try_init()
    };

    installed.map_err(|e| UnicalError::Internal(format!("tracing already initialised: {e}")))?;
    tracing::debug!(json = config.json, "tracing initialised");
    Ok(())
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| UnicalError::Config(format!("invalid log filter '{}': {e}", config.filter))),
    }
}
