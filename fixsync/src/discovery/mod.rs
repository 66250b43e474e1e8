//! Remote artifact discovery.
//!
//! Two independent strategies resolve "what is available":
//! - [`WebSearchDiscovery`] scrapes the support knowledge base search for
//!   fix package upload links
//! - [`FtpDiscovery`] walks the distribution mirror for the newest image
//!
//! Both absorb network and parse failures at the trait boundary: a failed
//! discovery logs and yields nothing, so a polling pass is never aborted by
//! an unreachable source. Each concrete type also exposes a `try_*` method
//! returning the underlying error for callers that want it.

mod ftp;
mod types;
mod version;
mod web;

pub use ftp::{FtpDiscovery, FtpLister, SuppaFtpLister};
pub use types::{DistroArtifact, DistroKind, DownloadState, RemoteArtifact};
pub use version::{find_product_version, FixedVersion, SupportSiteVersion};
pub use web::{extract_artifacts, search_term, WebSearchDiscovery};

use thiserror::Error;

use crate::events::Reporter;

/// Errors raised inside discovery before being absorbed.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// HTTP request could not be sent or read.
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    /// Server answered with a non-success status.
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// FTP command failed.
    #[error("FTP operation on {url} failed: {reason}")]
    Ftp { url: String, reason: String },

    /// A configured or discovered URL is malformed.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The version page did not mention a product version.
    #[error("no product version found at {0}")]
    VersionNotFound(String),
}

/// Source of fix packages for a product version.
pub trait FixDiscovery: Send + Sync {
    /// Artifacts published for `version`; empty on any failure.
    fn discover(&self, version: &str, reporter: &Reporter) -> Vec<RemoteArtifact>;
}

/// Source of the newest distribution image of one kind.
pub trait DistroDiscovery: Send + Sync {
    /// Which image line this source serves.
    fn kind(&self) -> DistroKind;

    /// Newest image, or `None` on any failure.
    fn discover(&self, reporter: &Reporter) -> Option<DistroArtifact>;
}

/// Resolves the product version fix packages are searched for.
pub trait VersionSource: Send + Sync {
    fn resolve(&self) -> Result<String, DiscoveryError>;
}
