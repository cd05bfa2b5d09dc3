//! File-based tracing setup.
//!
//! The terminal belongs to the TUI, so log lines go to a daily rolling file
//! under the configured directory. `RUST_LOG` overrides the configured filter.

use std::fs;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingSettings;

const LOG_FILE_PREFIX: &str = "vinyl.log";

/// Install the global subscriber. Keep the returned guard alive until exit or
/// buffered lines are lost.
pub fn init_logging(
    settings: &LoggingSettings,
) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let dir = settings
        .resolved_directory()
        .unwrap_or_else(|| PathBuf::from(".logs"));
    fs::create_dir_all(&dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new(LoggingSettings::default().filter));

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;

    tracing::info!(dir = %dir.display(), "logging initialised");
    Ok(guard)
}
