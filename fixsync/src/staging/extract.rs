//! Archive extraction into a shared staging tree.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use super::StagingError;
use crate::archive::ArchiveFormat;

/// Extracts one archive into a directory, overwriting existing files.
pub trait ArchiveExtractor: Send + Sync {
    /// Extract every file of `archive` under `dest`; returns the file count.
    fn extract(
        &self,
        archive: &Path,
        format: ArchiveFormat,
        dest: &Path,
    ) -> Result<usize, StagingError>;
}

/// In-process ZIP and RAR extraction.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeExtractor;

impl NativeExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_zip(&self, archive: &Path, dest: &Path) -> Result<usize, StagingError> {
        let failed = |reason: String| StagingError::Extraction {
            path: archive.to_path_buf(),
            reason,
        };
        let file = File::open(archive).map_err(|e| StagingError::Io {
            path: archive.to_path_buf(),
            source: e,
        })?;
        let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| failed(e.to_string()))?;

        let mut count = 0;
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).map_err(|e| failed(e.to_string()))?;
            let Some(relative) = entry.enclosed_name() else {
                warn!(archive = %archive.display(), entry = entry.name(), "skipping entry outside archive root");
                continue;
            };
            let target = dest.join(relative);

            if entry.is_dir() {
                create_dir(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                create_dir(parent)?;
            }
            let mut out = File::create(&target).map_err(|e| StagingError::Io {
                path: target.clone(),
                source: e,
            })?;
            io::copy(&mut entry, &mut out).map_err(|e| StagingError::Io {
                path: target.clone(),
                source: e,
            })?;
            count += 1;
        }
        Ok(count)
    }

    fn extract_rar(&self, archive: &Path, dest: &Path) -> Result<usize, StagingError> {
        let failed = |reason: String| StagingError::Extraction {
            path: archive.to_path_buf(),
            reason,
        };
        let mut open = unrar::Archive::new(archive)
            .open_for_processing()
            .map_err(|e| failed(e.to_string()))?;

        let mut count = 0;
        while let Some(header) = open.read_header().map_err(|e| failed(e.to_string()))? {
            let entry = header.entry();
            let relative = entry.filename.clone();

            open = if entry.is_file() && is_enclosed(&relative) {
                let target = dest.join(&relative);
                // Later archives win.
                if target.is_file() {
                    fs::remove_file(&target).map_err(|e| StagingError::Io {
                        path: target.clone(),
                        source: e,
                    })?;
                }
                count += 1;
                header
                    .extract_with_base(dest)
                    .map_err(|e| failed(e.to_string()))?
            } else {
                if entry.is_file() {
                    warn!(archive = %archive.display(), entry = %relative.display(), "skipping entry outside archive root");
                }
                header.skip().map_err(|e| failed(e.to_string()))?
            };
        }
        Ok(count)
    }
}

impl ArchiveExtractor for NativeExtractor {
    fn extract(
        &self,
        archive: &Path,
        format: ArchiveFormat,
        dest: &Path,
    ) -> Result<usize, StagingError> {
        create_dir(dest)?;
        let count = match format {
            ArchiveFormat::Zip => self.extract_zip(archive, dest)?,
            ArchiveFormat::Rar => self.extract_rar(archive, dest)?,
        };
        debug!(archive = %archive.display(), files = count, "extracted archive");
        Ok(count)
    }
}

fn is_enclosed(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn create_dir(path: &Path) -> Result<(), StagingError> {
    fs::create_dir_all(path).map_err(|e| StagingError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Count files recursively in a directory.
pub fn count_files_recursive(dir: &Path) -> Result<usize, StagingError> {
    if !dir.exists() {
        return Ok(0);
    }
    let entries = fs::read_dir(dir).map_err(|e| StagingError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut count = 0;
    for entry in entries.flatten() {
        let path: PathBuf = entry.path();
        if path.is_file() {
            count += 1;
        } else if path.is_dir() {
            count += count_files_recursive(&path)?;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in files {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_zip_extracts_nested_files() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("a.zip");
        write_zip(&archive, &[("bin/app.dll", b"v1"), ("readme.txt", b"hi")]);

        let dest = temp.path().join("out");
        let count = NativeExtractor::new()
            .extract(&archive, ArchiveFormat::Zip, &dest)
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(fs::read(dest.join("bin/app.dll")).unwrap(), b"v1");
        assert_eq!(count_files_recursive(&dest).unwrap(), 2);
    }

    #[test]
    fn test_zip_overwrites_existing_files() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out");
        fs::create_dir_all(dest.join("bin")).unwrap();
        fs::write(dest.join("bin/app.dll"), b"old").unwrap();

        let archive = temp.path().join("b.zip");
        write_zip(&archive, &[("bin/app.dll", b"new")]);
        NativeExtractor::new()
            .extract(&archive, ArchiveFormat::Zip, &dest)
            .unwrap();

        assert_eq!(fs::read(dest.join("bin/app.dll")).unwrap(), b"new");
    }

    #[test]
    fn test_corrupt_zip_is_extraction_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bad.zip");
        fs::write(&archive, b"not a zip").unwrap();

        let err = NativeExtractor::new()
            .extract(&archive, ArchiveFormat::Zip, &temp.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, StagingError::Extraction { .. }));
    }

    #[test]
    fn test_corrupt_rar_is_extraction_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bad.rar");
        fs::write(&archive, b"not a rar").unwrap();

        let err = NativeExtractor::new()
            .extract(&archive, ArchiveFormat::Rar, &temp.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, StagingError::Extraction { .. }));
    }

    #[test]
    fn test_is_enclosed() {
        assert!(is_enclosed(Path::new("a/b.txt")));
        assert!(!is_enclosed(Path::new("../b.txt")));
        assert!(!is_enclosed(Path::new("/etc/passwd")));
    }
}
