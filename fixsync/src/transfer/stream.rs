//! Chunked copy with progress and cooperative cancellation.

use std::io::{Read, Write};
use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::{TransferError, TransferProgress};

/// Copy buffer size (80KB).
pub const CHUNK_SIZE: usize = 80 * 1024;

/// Context for one streamed download.
pub(crate) struct StreamTarget<'a> {
    pub url: &'a str,
    pub path: &'a Path,
    pub name: &'a str,
    pub total: Option<u64>,
}

/// Stream `reader` into `writer` chunk by chunk.
///
/// Cancellation is checked before every read; when triggered the copy stops
/// and the partially written data is left as is.
pub(crate) fn copy_with_progress<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    target: &StreamTarget<'_>,
    progress: &dyn Fn(TransferProgress),
    cancel: &CancellationToken,
) -> Result<u64, TransferError> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut received = 0u64;

    progress(TransferProgress::new(0, target.total));

    loop {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled {
                name: target.name.to_string(),
            });
        }

        let bytes_read = match reader.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(TransferError::Network {
                    url: target.url.to_string(),
                    reason: format!("read error: {}", e),
                })
            }
        };
        if bytes_read == 0 {
            break;
        }

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| TransferError::Write {
                path: target.path.to_path_buf(),
                source: e,
            })?;

        received += bytes_read as u64;
        progress(TransferProgress::new(received, target.total));
    }

    writer.flush().map_err(|e| TransferError::Write {
        path: target.path.to_path_buf(),
        source: e,
    })?;

    Ok(received)
}
