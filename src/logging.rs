//! Logging configuration and initialization.
//!
//! Sets up the `tracing` subscriber, optionally directing logs to a daily
//! rolling file instead of stdout.

use crate::config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize logging based on the provided configuration.
///
/// Returns the appender's `WorkerGuard` when logging to a file. Hold it for the
/// whole run; dropping it early loses buffered lines.
pub fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.log_to_file {
        let file_appender = rolling::daily(&config.log_dir, "cyberset.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .init();

        Some(guard)
    } else {
        fmt().with_env_filter(env_filter).with_target(false).init();

        None
    }
}
