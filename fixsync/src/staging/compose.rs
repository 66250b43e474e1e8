//! Self-extracting installer composition.
//!
//! The installer is three blobs written back to back with no framing:
//! the stub module, its configuration block, then the compressed payload.
//! The stub finds the payload boundary on its own, so nothing may be
//! inserted, reordered or padded between the segments.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::process::Command;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::toolkit::{PreparedTools, SfxToolkit, RUN_SCRIPT};
use super::CompositionError;
use crate::events::Reporter;

/// Name of the intermediate payload inside the tools directory.
pub const PAYLOAD_NAME: &str = "payload.7z";

/// Copy buffer size (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Packs a directory into one compressed container.
pub trait Compressor: Send + Sync {
    fn compress(
        &self,
        tools: &PreparedTools,
        source_dir: &Path,
        archive: &Path,
    ) -> Result<(), CompositionError>;
}

/// Runs the bundled `7z.exe a "<archive>" "<source>\*"` in the tools directory.
#[derive(Debug, Default, Clone)]
pub struct SevenZipCompressor {
    program: Option<PathBuf>,
}

impl SevenZipCompressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a packer other than the bundled one (e.g. a native `7z` on Unix).
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }
}

impl Compressor for SevenZipCompressor {
    fn compress(
        &self,
        tools: &PreparedTools,
        source_dir: &Path,
        archive: &Path,
    ) -> Result<(), CompositionError> {
        let program = self.program.clone().unwrap_or_else(|| tools.packer());
        let sources = format!("{}{}*", source_dir.display(), MAIN_SEPARATOR);
        debug!(program = %program.display(), archive = %archive.display(), sources = %sources, "running packer");

        let output = Command::new(&program)
            .current_dir(tools.dir())
            .arg("a")
            .arg(archive)
            .arg(&sources)
            .output()
            .map_err(|e| CompositionError::Launch {
                program: program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CompositionError::Compressor {
                code: output.status.code(),
                stderr,
            });
        }
        Ok(())
    }
}

/// A written installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerReport {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the installer.
    pub sha256: String,
}

/// Concatenate `parts` into `output` in order; returns the byte count.
pub fn concatenate_parts(parts: &[PathBuf], output: &Path) -> Result<u64, CompositionError> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| CompositionError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let file = File::create(output).map_err(|e| CompositionError::Io {
        path: output.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;

    for part in parts {
        let file = File::open(part).map_err(|e| CompositionError::Io {
            path: part.clone(),
            source: e,
        })?;
        let mut reader = BufReader::new(file);
        loop {
            let bytes_read = reader.read(&mut buffer).map_err(|e| CompositionError::Io {
                path: part.clone(),
                source: e,
            })?;
            if bytes_read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| CompositionError::Io {
                    path: output.to_path_buf(),
                    source: e,
                })?;
            total += bytes_read as u64;
        }
    }

    writer.flush().map_err(|e| CompositionError::Io {
        path: output.to_path_buf(),
        source: e,
    })?;
    Ok(total)
}

/// SHA-256 of a file as lowercase hex.
pub fn file_checksum(path: &Path) -> Result<String, CompositionError> {
    let io_error = |e: io::Error| CompositionError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = File::open(path).map_err(io_error)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let bytes_read = file.read(&mut buffer).map_err(io_error)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Builds installers from a staged directory.
pub struct InstallerComposer<C = SevenZipCompressor> {
    toolkit: SfxToolkit,
    compressor: C,
    scratch_root: PathBuf,
}

impl<C: Compressor> InstallerComposer<C> {
    pub fn new(toolkit: SfxToolkit, compressor: C, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            toolkit,
            compressor,
            scratch_root: scratch_root.into(),
        }
    }

    /// Pack `staging_dir` and write the installer to `output`.
    ///
    /// The run script is placed in the staging root for the duration of the
    /// pack. The private tools directory is removed before returning.
    pub fn compose(
        &self,
        staging_dir: &Path,
        output: &Path,
        reporter: &Reporter,
    ) -> Result<InstallerReport, CompositionError> {
        let tools = self.toolkit.prepare(&self.scratch_root)?;
        let payload = tools.dir().join(PAYLOAD_NAME);

        let injected = staging_dir.join(RUN_SCRIPT);
        fs::copy(tools.run_script(), &injected).map_err(|e| CompositionError::Io {
            path: injected.clone(),
            source: e,
        })?;

        reporter.info("Packing staged files");
        let packed = self.compressor.compress(&tools, staging_dir, &payload);

        if let Err(e) = fs::remove_file(&injected) {
            warn!(path = %injected.display(), error = %e, "failed to remove run script from staging");
        }
        packed?;

        let size_bytes = concatenate_parts(
            &[tools.sfx_stub(), tools.sfx_config(), payload.clone()],
            output,
        )?;
        let sha256 = file_checksum(output)?;
        info!(path = %output.display(), size_bytes, sha256 = %sha256, "installer written");
        reporter.info(format!("Installer created: {}", output.display()));
        Ok(InstallerReport {
            path: output.to_path_buf(),
            size_bytes,
            sha256,
        })
    }
}
