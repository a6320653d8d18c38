//! Console tracing setup.

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

/// Installs the global fmt subscriber. An explicit `RUST_LOG` wins over the
/// configured level.
pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("ferry={level},ferry_bridge={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
