//! Loop and fix package state.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::archive::ArchiveKey;
use crate::discovery::{DistroArtifact, RemoteArtifact};
use crate::staging::RepackageReport;

/// Whether a reconciliation pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Busy,
}

/// Lifecycle of a tracked fix package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixState {
    /// Discovered and not present locally.
    New,
    /// A file with the same key already exists in the download directory.
    AlreadyDownloaded,
    Downloading,
    Done,
    Cancelled,
    Failed,
}

impl FixState {
    /// States from which a selected entry is (re)downloaded.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::New | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for FixState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::New => "new",
            Self::AlreadyDownloaded => "downloaded",
            Self::Downloading => "downloading",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A discovered fix package as tracked across passes.
#[derive(Debug, Clone, PartialEq)]
pub struct FixEntry {
    pub artifact: RemoteArtifact,
    /// `None` when the name does not follow the package convention.
    pub key: Option<ArchiveKey>,
    pub selected: bool,
    pub state: FixState,
}

impl FixEntry {
    pub fn name(&self) -> &str {
        &self.artifact.name
    }
}

/// Snapshot of the loop for status displays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopStatus {
    pub state: LoopState,
    /// Human-readable label of the current step.
    pub phase: String,
    pub last_checked: Option<DateTime<Local>>,
    pub last_error: Option<String>,
    pub current_version: Option<String>,
}

/// What one pass or download run produced.
#[derive(Debug, Clone, Default)]
pub struct PassOutcome {
    /// Fix packages first seen during this pass.
    pub new_fixes: Vec<String>,
    /// Files written by fix package downloads.
    pub downloaded: Vec<PathBuf>,
    pub installers: Vec<RepackageReport>,
    /// Distribution images found during this pass.
    pub distros: Vec<DistroArtifact>,
    /// Distribution images written during this pass.
    pub distro_files: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_states() {
        assert!(FixState::New.is_pending());
        assert!(FixState::Failed.is_pending());
        assert!(FixState::Cancelled.is_pending());
        assert!(!FixState::Done.is_pending());
        assert!(!FixState::AlreadyDownloaded.is_pending());
        assert!(!FixState::Downloading.is_pending());
    }

    #[test]
    fn test_default_status_is_idle() {
        let status = LoopStatus::default();
        assert_eq!(status.state, LoopState::Idle);
        assert!(status.last_checked.is_none());
    }
}
