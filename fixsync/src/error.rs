//! Top-level error type for pipeline operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use crate::staging::{CompositionError, StagingError};
use crate::transfer::TransferError;

/// Result type for pipeline operations.
pub type FixsyncResult<T> = Result<T, FixsyncError>;

/// Errors surfaced by the pipeline to its host.
#[derive(Debug, Error)]
pub enum FixsyncError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("repackaging failed: {0}")]
    Staging(#[from] StagingError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FixsyncError {
    /// True when the user stopped the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transfer(e) if e.is_cancelled())
    }
}

impl From<CompositionError> for FixsyncError {
    fn from(e: CompositionError) -> Self {
        Self::Staging(StagingError::Composition(e))
    }
}
