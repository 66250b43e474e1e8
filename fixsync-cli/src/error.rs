//! CLI error type.

use std::fmt;
use std::io;

use fixsync::config::ConfigError;
use fixsync::staging::StagingError;
use fixsync::transfer::TransferError;
use fixsync::FixsyncError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Missing or invalid settings.
    Config(String),
    /// A pipeline operation failed.
    Pipeline(FixsyncError),
    /// The user interrupted the operation.
    Cancelled,
    Io(io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{}", msg),
            CliError::Pipeline(e) => write!(f, "{}", e),
            CliError::Cancelled => write!(f, "Cancelled"),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Pipeline(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<FixsyncError> for CliError {
    fn from(e: FixsyncError) -> Self {
        match e {
            FixsyncError::Config(e) => e.into(),
            e if e.is_cancelled() => CliError::Cancelled,
            e => CliError::Pipeline(e),
        }
    }
}

impl From<TransferError> for CliError {
    fn from(e: TransferError) -> Self {
        FixsyncError::from(e).into()
    }
}

impl From<StagingError> for CliError {
    fn from(e: StagingError) -> Self {
        CliError::Pipeline(e.into())
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
