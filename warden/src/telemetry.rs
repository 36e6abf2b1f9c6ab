//! Tracing initialization.
//!
//! Installs a `tracing_subscriber` registry with an [`EnvFilter`] and a console fmt layer. The
//! filter is read from `RUST_LOG` and falls back to `info`, e.g.:
//!
//! ```bash
//! RUST_LOG=warden=debug,tower_http=debug warden -f config.yaml
//! ```

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize console tracing.
///
/// Fails if a global subscriber has already been installed.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    info!("Telemetry initialized");
    Ok(())
}
