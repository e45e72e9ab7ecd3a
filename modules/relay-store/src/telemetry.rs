//! Tracing setup for binaries and test harnesses embedding a store.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install a human-readable fmt subscriber filtered by `RUST_LOG` plus
/// `default_directive` (e.g. `"relay_store=info"`).
pub fn init_tracing(default_directive: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_directive)?)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

/// Same as [`init_tracing`], emitting one JSON object per line.
pub fn init_json_tracing(default_directive: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(default_directive)?)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

fn filter(default_directive: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env().add_directive(default_directive.parse()?))
}
