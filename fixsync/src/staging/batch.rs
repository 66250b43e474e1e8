//! Uniquely named scratch directories removed on drop.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of merge staging directories.
pub const STAGING_PREFIX: &str = "fixsync_Staging_";
/// Prefix of private tools directories.
pub const TOOLS_PREFIX: &str = "fixsync_Tools_";

/// A scratch directory owned by one repackaging run.
///
/// The name carries a fresh UUID so batches are never reused; the directory
/// and everything in it is removed when the batch is dropped, on success and
/// error paths alike.
#[derive(Debug)]
pub struct StagingBatch {
    path: PathBuf,
}

impl StagingBatch {
    /// Create `<root>/<prefix><uuid>`.
    pub fn create(root: &Path, prefix: &str) -> io::Result<Self> {
        let path = root.join(format!("{}{}", prefix, Uuid::new_v4().simple()));
        fs::create_dir_all(&path)?;
        debug!(path = %path.display(), "created scratch directory");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingBatch {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed scratch directory"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove scratch directory"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::StagingError;
    use tempfile::TempDir;

    #[test]
    fn test_batches_are_unique_and_removed() {
        let temp = TempDir::new().unwrap();
        let first = StagingBatch::create(temp.path(), STAGING_PREFIX).unwrap();
        let second = StagingBatch::create(temp.path(), STAGING_PREFIX).unwrap();
        assert_ne!(first.path(), second.path());

        let first_path = first.path().to_path_buf();
        fs::create_dir_all(first_path.join("a/b")).unwrap();
        fs::write(first_path.join("a/b/c.txt"), b"x").unwrap();

        drop(first);
        assert!(!first_path.exists());
        assert!(second.path().exists());
    }

    #[test]
    fn test_batch_removed_on_error_path() {
        fn failing(root: &Path) -> Result<PathBuf, StagingError> {
            let batch = StagingBatch::create(root, TOOLS_PREFIX).map_err(|e| StagingError::Io {
                path: root.to_path_buf(),
                source: e,
            })?;
            let path = batch.path().to_path_buf();
            Err(StagingError::Extraction {
                path,
                reason: "corrupt".to_string(),
            })
        }

        let temp = TempDir::new().unwrap();
        let err = failing(temp.path()).unwrap_err();
        let StagingError::Extraction { path, .. } = err else {
            panic!("unexpected error");
        };
        assert!(path.file_name().unwrap().to_string_lossy().starts_with(TOOLS_PREFIX));
        assert!(!path.exists());
    }
}
