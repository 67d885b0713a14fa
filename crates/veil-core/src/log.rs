//! Logging setup.
//!
//! Events go to stderr so that stdout stays clean for document output.
//! `RUST_LOG`, when set, takes precedence over the configured level.

use tracing_subscriber::{fmt, EnvFilter};
use veil_types::{LogConfig, LogFormat, LogLevel, Result, VeilError};

/// Initialize the global subscriber from configuration.
///
/// Fails if a subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(directive(config.level, std::env::var("RUST_LOG").ok()))
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    let installed = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    installed.map_err(|e| VeilError::Other(format!("Failed to initialize logging: {}", e)))
}

/// Filter directive to use: `RUST_LOG` if it is non-empty, else `level`.
fn directive(level: LogLevel, rust_log: Option<String>) -> String {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| level.as_directive().to_string())
}
