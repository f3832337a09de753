//! Logging setup
//!
//! `RUST_LOG` controls levels, defaulting to `info`.

use crate::cli::LogFormat;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// # Errors
/// A global subscriber was already installed.
pub fn init(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}
