//! Configuration file handling.
//!
//! Settings live in an INI file at `~/.config/fixsync/config.ini` (or the
//! platform equivalent). [`ConfigFile`] is the raw, persisted form;
//! [`PipelineConfig`] is the resolved value handed to each component at
//! construction. Nothing in the pipeline reads configuration from global
//! state.

mod file;
mod keys;
mod pipeline;

pub use file::{
    config_directory, config_file_path, default_log_directory, AutomationSettings, ConfigFile,
    LoggingSettings, NetworkSettings, PathsSettings, SourcesSettings,
};
pub use keys::ConfigKey;
pub use pipeline::{check_interval_from_minutes, DistroSource, PipelineConfig};

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, editing or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read or parsed.
    #[error("failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// The config file could not be written.
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required setting is empty.
    #[error("required setting '{0}' is not set")]
    Missing(&'static str),

    /// A setting holds a value that cannot be used.
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// `section.key` does not name a known setting.
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}
