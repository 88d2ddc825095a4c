//! Log output for the oscreel binary.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `log_level` is an `EnvFilter` directive such as `info` or
/// `oscreel=debug,warn`.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("Invalid log level '{}'", log_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
