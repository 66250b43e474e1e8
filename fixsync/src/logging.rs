//! Log sink setup.
//!
//! Events go to stderr (warnings and errors only, so terminal progress
//! output stays readable) and to a daily-rolling file under the log
//! directory at the configured level. `RUST_LOG` overrides the level.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::config::{default_log_directory, LoggingSettings};

/// Base name of the rolling log file; the appender adds a date suffix.
pub const LOG_FILE_NAME: &str = "fixsync.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Level filter from a config value; `verbose` raises it to debug or trace.
pub fn resolve_level(configured: &str, verbose: u8) -> LevelFilter {
    match verbose {
        0 => configured
            .trim()
            .parse::<LevelFilter>()
            .unwrap_or(LevelFilter::INFO),
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Directory log files are written to.
pub fn log_directory(settings: &LoggingSettings) -> PathBuf {
    settings
        .directory
        .clone()
        .unwrap_or_else(default_log_directory)
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// for the lifetime of the process.
pub fn init(settings: &LoggingSettings, verbose: u8) -> Result<WorkerGuard, LoggingError> {
    let level = resolve_level(&settings.level, verbose);
    let dir = log_directory(settings);
    fs::create_dir_all(&dir).map_err(|e| LoggingError::CreateDir {
        path: dir.clone(),
        source: e,
    })?;

    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let stderr_writer = std::io::stderr.with_max_level(Level::WARN);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::rfc_3339())
        .with_target(false)
        .with_ansi(false)
        .with_writer(stderr_writer.and(file_writer))
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    tracing::debug!(dir = %dir.display(), %level, "logging initialized");
    Ok(guard)
}
