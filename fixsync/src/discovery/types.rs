//! Descriptors produced by discovery.

use std::fmt;

use crate::archive::{parse_archive_key, ArchiveKey};

/// A fix package found by the web search.
///
/// Immutable once discovered; `url` is the decoded upload path as scraped,
/// which is usually relative to the support host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteArtifact {
    /// Filename, the last segment of `url`.
    pub name: String,
    /// Decoded (possibly relative) upload path.
    pub url: String,
    /// Product version the search was issued for.
    pub version: String,
}

impl RemoteArtifact {
    /// Parsed key of the filename, if it follows the naming convention.
    pub fn key(&self) -> Option<ArchiveKey> {
        parse_archive_key(&self.name).ok()
    }
}

/// Download state of a distribution image.
///
/// Moves forward only: `Available -> Downloading -> {Done | Cancelled | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadState {
    #[default]
    Available,
    Downloading,
    Done,
    Cancelled,
    Failed,
}

impl DownloadState {
    /// Whether the state is final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Failed)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_advance_to(&self, next: DownloadState) -> bool {
        match (self, next) {
            (Self::Available, Self::Downloading) => true,
            (Self::Downloading, n) => n.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Available => "available",
            Self::Downloading => "downloading",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Which distribution line an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistroKind {
    /// Main (OE) installation image.
    Oe,
    /// Industrial (Prom) installation image.
    Prom,
}

impl DistroKind {
    pub const ALL: [DistroKind; 2] = [DistroKind::Oe, DistroKind::Prom];

    /// Config key holding the target directory for this kind.
    pub fn dir_key(&self) -> &'static str {
        match self {
            Self::Oe => "paths.oe_distro_dir",
            Self::Prom => "paths.prom_distro_dir",
        }
    }

    /// Config key holding the FTP root for this kind.
    pub fn url_key(&self) -> &'static str {
        match self {
            Self::Oe => "sources.oe_ftp_url",
            Self::Prom => "sources.prom_ftp_url",
        }
    }
}

impl fmt::Display for DistroKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oe => f.write_str("OE"),
            Self::Prom => f.write_str("Prom"),
        }
    }
}

/// A distribution image found on the FTP mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroArtifact {
    pub kind: DistroKind,
    /// Normalized dotted version of the folder it was found in.
    pub version: String,
    pub file_name: String,
    /// Absolute `ftp://` URL of the file.
    pub full_url: String,
    /// Known only after a successful size probe.
    pub size_bytes: Option<u64>,
    pub state: DownloadState,
    pub progress_percent: u8,
}

impl DistroArtifact {
    /// Fresh descriptor in the `Available` state.
    pub fn new(
        kind: DistroKind,
        version: impl Into<String>,
        file_name: impl Into<String>,
        full_url: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            version: version.into(),
            file_name: file_name.into(),
            full_url: full_url.into(),
            size_bytes: None,
            state: DownloadState::Available,
            progress_percent: 0,
        }
    }

    /// Move to `next` if the transition is legal; returns whether it moved.
    pub fn advance(&mut self, next: DownloadState) -> bool {
        if self.state.can_advance_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_moves_forward_only() {
        let mut distro = DistroArtifact::new(DistroKind::Oe, "25.1.1.1", "a.rar", "ftp://h/a.rar");
        assert!(!distro.advance(DownloadState::Done));
        assert!(distro.advance(DownloadState::Downloading));
        assert!(distro.advance(DownloadState::Cancelled));
        assert!(!distro.advance(DownloadState::Downloading));
        assert!(!distro.advance(DownloadState::Available));
        assert_eq!(distro.state, DownloadState::Cancelled);
    }

    #[test]
    fn test_remote_artifact_key() {
        let artifact = RemoteArtifact {
            name: "kpe_25.1.1.1_fix4.zip".to_string(),
            url: "/upload/x/kpe_25.1.1.1_fix4.zip".to_string(),
            version: "25.1.1.1".to_string(),
        };
        assert_eq!(artifact.key(), Some(ArchiveKey::new("kpe_25.1.1.1", 4)));
    }
}
