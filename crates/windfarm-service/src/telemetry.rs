//! Tracing subscriber setup for host processes.

use anyhow::{Context, Result};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `log_level` (e.g. from
/// [`windfarm_types::Settings::log_level`]) is used as the filter.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}
