//! Single-artifact downloads over HTTP(S) and FTP.
//!
//! [`TransferClient`] resolves a possibly relative artifact path, picks the
//! protocol from the URL scheme, and streams the body to disk in fixed-size
//! chunks. Progress is reported after every chunk and cancellation is
//! checked at every chunk boundary.
//!
//! The client never checks whether the destination already exists; callers
//! skip artifacts already present before asking for a transfer.

mod ftp;
mod http;
mod resolve;
mod stream;

pub use ftp::FtpTransfer;
pub use http::{http_client, HttpTransfer};
pub use resolve::resolve_url;
pub use stream::CHUNK_SIZE;

pub(crate) use ftp::{ftp_path, open_ftp};

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::PipelineConfig;
use crate::discovery::{DistroArtifact, RemoteArtifact};

/// Errors from a single transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The artifact path could not be turned into a URL.
    #[error("invalid download URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection, protocol or read failure.
    #[error("download from {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// HTTP server answered with a non-success status.
    #[error("download from {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Writing the local file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transfer was stopped through its cancellation token.
    #[error("download of {name} was cancelled")]
    Cancelled { name: String },

    /// The URL scheme is neither HTTP(S) nor FTP.
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
}

impl TransferError {
    /// Whether this is a user-requested stop rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Download progress snapshot.
///
/// `total` is `None` when the size is unknown, which is distinct from 0%.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub received: u64,
    pub total: Option<u64>,
}

impl TransferProgress {
    pub fn new(received: u64, total: Option<u64>) -> Self {
        Self { received, total }
    }

    /// Percentage clamped to `0..=100`, or `None` if the total is unknown.
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(0) | None => None,
            Some(total) => {
                let pct = self.received.saturating_mul(100) / total;
                Some(pct.min(100) as u8)
            }
        }
    }
}

/// What to download and under which local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Absolute URL or a path relative to the support host.
    pub url: String,
    pub file_name: String,
}

impl TransferRequest {
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
        }
    }
}

impl From<&RemoteArtifact> for TransferRequest {
    fn from(artifact: &RemoteArtifact) -> Self {
        Self::new(&artifact.url, &artifact.name)
    }
}

impl From<&DistroArtifact> for TransferRequest {
    fn from(artifact: &DistroArtifact) -> Self {
        Self::new(&artifact.full_url, &artifact.file_name)
    }
}

/// Download capability used by the reconciliation loop.
pub trait Transfer: Send + Sync {
    /// Fetch `request` into `dest_dir`, returning the written path.
    ///
    /// Fails with [`TransferError::Cancelled`] when `cancel` fires; the
    /// partial file is left behind.
    fn download(
        &self,
        request: &TransferRequest,
        dest_dir: &Path,
        progress: &dyn Fn(TransferProgress),
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TransferError>;

    /// Whether the artifact is reachable. Never fails.
    fn validate(&self, request: &TransferRequest) -> bool;
}

/// Scheme-dispatching [`Transfer`] implementation.
#[derive(Debug, Clone)]
pub struct TransferClient {
    base: Url,
    http: HttpTransfer,
    ftp: FtpTransfer,
}

impl TransferClient {
    pub fn new(base: Url, http: HttpTransfer, ftp: FtpTransfer) -> Self {
        Self { base, http, ftp }
    }

    /// Build from resolved settings.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, TransferError> {
        let base = Url::parse(&config.support_url).map_err(|e| TransferError::InvalidUrl {
            url: config.support_url.clone(),
            reason: e.to_string(),
        })?;
        let client = http_client(&config.user_agent, config.timeout, None)?;
        Ok(Self::new(
            base,
            HttpTransfer::new(client),
            FtpTransfer::new(config.timeout),
        ))
    }

    /// Absolute URL for a request.
    pub fn resolve(&self, request: &TransferRequest) -> Result<Url, TransferError> {
        resolve_url(&self.base, &request.url)
    }
}

impl Transfer for TransferClient {
    fn download(
        &self,
        request: &TransferRequest,
        dest_dir: &Path,
        progress: &dyn Fn(TransferProgress),
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TransferError> {
        let url = self.resolve(request)?;
        match url.scheme() {
            "http" | "https" => {
                self.http
                    .fetch(&url, &request.file_name, dest_dir, progress, cancel)
            }
            "ftp" => self
                .ftp
                .fetch(&url, &request.file_name, dest_dir, progress, cancel),
            other => Err(TransferError::UnsupportedScheme(other.to_string())),
        }
    }

    fn validate(&self, request: &TransferRequest) -> bool {
        match self.resolve(request) {
            Ok(url) if url.scheme().starts_with("http") => self.http.probe(&url),
            Ok(_) => false,
            Err(e) => {
                tracing::debug!(error = %e, "cannot validate artifact");
                false
            }
        }
    }
}
