//! HTTP(S) downloads.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use super::stream::{copy_with_progress, StreamTarget};
use super::{TransferError, TransferProgress};

/// Build the blocking client shared by discovery and transfer.
///
/// `total` bounds a whole request; pass `None` for large downloads, which
/// are bounded by the connect timeout and cancellation instead.
pub fn http_client(
    user_agent: &str,
    connect_timeout: Duration,
    total: Option<Duration>,
) -> Result<Client, TransferError> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(connect_timeout)
        .timeout(total)
        .build()
        .map_err(|e| TransferError::Network {
            url: String::new(),
            reason: format!("failed to create HTTP client: {}", e),
        })
}

/// Streams HTTP responses to disk.
#[derive(Debug, Clone)]
pub struct HttpTransfer {
    client: Client,
}

impl HttpTransfer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Whether a `HEAD` request for `url` succeeds.
    pub fn probe(&self, url: &Url) -> bool {
        match self.client.head(url.clone()).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = %url, error = %e, "HEAD probe failed");
                false
            }
        }
    }

    /// Download `url` into `dest_dir/file_name`.
    pub fn fetch(
        &self,
        url: &Url,
        file_name: &str,
        dest_dir: &Path,
        progress: &dyn Fn(TransferProgress),
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TransferError> {
        let network_error = |e: reqwest::Error| TransferError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };

        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled {
                name: file_name.to_string(),
            });
        }

        info!(url = %url, file = file_name, "starting HTTP download");
        let mut response = self.client.get(url.clone()).send().map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let total = response.content_length();

        let dest = create_destination(dest_dir, file_name)?;
        let file = File::create(&dest).map_err(|e| TransferError::Write {
            path: dest.clone(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);

        let target = StreamTarget {
            url: url.as_str(),
            path: &dest,
            name: file_name,
            total,
        };
        let received = copy_with_progress(&mut response, &mut writer, &target, progress, cancel)?;

        info!(file = file_name, bytes = received, "HTTP download completed");
        Ok(dest)
    }
}

/// Create `dest_dir` and return the target path inside it.
pub(crate) fn create_destination(dest_dir: &Path, file_name: &str) -> Result<PathBuf, TransferError> {
    fs::create_dir_all(dest_dir).map_err(|e| TransferError::Write {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;
    Ok(dest_dir.join(file_name))
}
