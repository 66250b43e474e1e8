//! FTP downloads.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use percent_encoding::percent_decode_str;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use super::http::create_destination;
use super::stream::{copy_with_progress, StreamTarget};
use super::{TransferError, TransferProgress};

const DEFAULT_FTP_PORT: u16 = 21;
const ANONYMOUS: &str = "anonymous";

/// Decoded server-side path of an `ftp://` URL.
pub(crate) fn ftp_path(url: &Url) -> String {
    percent_decode_str(url.path()).decode_utf8_lossy().into_owned()
}

/// Connect, log in and switch to binary mode.
///
/// Credentials embedded in the URL are passed through; otherwise the
/// session is anonymous. No TLS.
pub(crate) fn open_ftp(url: &Url, timeout: Duration) -> Result<FtpStream, FtpError> {
    let addr = url
        .socket_addrs(|| Some(DEFAULT_FTP_PORT))
        .map_err(FtpError::ConnectionError)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            FtpError::ConnectionError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no address for {}", url),
            ))
        })?;

    let mut stream = FtpStream::connect_timeout(addr, timeout)?;
    stream.get_ref().set_read_timeout(Some(timeout)).ok();

    let user = match url.username() {
        "" => ANONYMOUS.to_string(),
        name => percent_decode_str(name).decode_utf8_lossy().into_owned(),
    };
    let password = url
        .password()
        .map(|p| percent_decode_str(p).decode_utf8_lossy().into_owned())
        .unwrap_or_else(|| ANONYMOUS.to_string());

    stream.login(user.as_str(), password.as_str())?;
    stream.transfer_type(FileType::Binary)?;
    Ok(stream)
}

/// Streams FTP `RETR` responses to disk.
#[derive(Debug, Clone)]
pub struct FtpTransfer {
    timeout: Duration,
}

impl FtpTransfer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Download `url` into `dest_dir/file_name`.
    ///
    /// A `SIZE` probe runs first; when it fails progress is indeterminate.
    pub fn fetch(
        &self,
        url: &Url,
        file_name: &str,
        dest_dir: &Path,
        progress: &dyn Fn(TransferProgress),
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TransferError> {
        let ftp_error = |e: FtpError| TransferError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };

        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled {
                name: file_name.to_string(),
            });
        }

        info!(url = %url, file = file_name, "starting FTP download");
        let mut stream = open_ftp(url, self.timeout).map_err(ftp_error)?;
        let path = ftp_path(url);

        let total = match stream.size(&path) {
            Ok(size) => Some(size as u64),
            Err(e) => {
                warn!(url = %url, error = %e, "could not get file size, progress will be indeterminate");
                None
            }
        };

        let dest = create_destination(dest_dir, file_name)?;
        let file = File::create(&dest).map_err(|e| TransferError::Write {
            path: dest.clone(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);

        let mut data = stream.retr_as_stream(&path).map_err(ftp_error)?;
        let target = StreamTarget {
            url: url.as_str(),
            path: &dest,
            name: file_name,
            total,
        };
        // On error the data connection is dropped without finalizing.
        let received = copy_with_progress(&mut data, &mut writer, &target, progress, cancel)?;

        stream.finalize_retr_stream(data).map_err(ftp_error)?;
        let _ = stream.quit();

        info!(file = file_name, bytes = received, "FTP download completed");
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ftp_path_is_decoded() {
        let url = Url::parse("ftp://mirror.example/OE/25%2010/EKP/%D0%B0.rar").unwrap();
        assert_eq!(ftp_path(&url), "/OE/25 10/EKP/а.rar");
    }

    #[test]
    fn test_cancelled_before_connect() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let url = Url::parse("ftp://127.0.0.1:9/a.rar").unwrap();
        let err = FtpTransfer::new(Duration::from_millis(200))
            .fetch(&url, "a.rar", Path::new("/nonexistent"), &|_| {}, &cancel)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_unreachable_server_is_network_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let url = Url::parse("ftp://127.0.0.1:9/a.rar").unwrap();
        let err = FtpTransfer::new(Duration::from_millis(500))
            .fetch(&url, "a.rar", temp.path(), &|_| {}, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, TransferError::Network { .. }));
    }
}
