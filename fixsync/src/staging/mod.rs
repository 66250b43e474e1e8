//! Staging merge and installer composition.
//!
//! A repackaging run takes the downloaded fix archives of one pass and, per
//! family, extracts them in `(family, sequence)` order into one fresh
//! staging directory, so a later fix overwrites an earlier one on path
//! collision. The staged tree is then packed and prefixed with the
//! self-extractor stub and its configuration to form `FIX_<label>.exe`.
//!
//! Staging and tools directories are [`StagingBatch`]es and are removed on
//! every exit path.

mod batch;
mod compose;
mod extract;
mod merger;
mod toolkit;

pub use batch::{StagingBatch, STAGING_PREFIX, TOOLS_PREFIX};
pub use compose::{
    concatenate_parts, file_checksum, Compressor, InstallerComposer, InstallerReport,
    SevenZipCompressor, PAYLOAD_NAME,
};
pub use extract::{count_files_recursive, ArchiveExtractor, NativeExtractor};
pub use merger::{
    collect_archives, installer_file_name, normalize_file_names, RepackageReport, Repackager,
    Repackage, StagingMerger,
};
pub use toolkit::{
    PreparedTools, SfxToolkit, PACKER, PACKER_LIBRARY, RUN_SCRIPT, SFX_CONFIG, SFX_STUB,
};

use std::path::PathBuf;

use thiserror::Error;

use crate::config::PipelineConfig;

/// Failures while building an installer.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// A bundled helper could not be found.
    #[error("missing installer helper '{0}'")]
    MissingResource(&'static str),

    /// The packer could not be started.
    #[error("failed to start packer {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The packer exited unsuccessfully.
    #[error("packer failed (exit code {}): {stderr}", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    Compressor { code: Option<i32>, stderr: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures in a Merge+Compose run.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An archive could not be read.
    #[error("failed to extract {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    #[error(transparent)]
    Composition(#[from] CompositionError),
}

impl Repackager {
    /// Native extraction and the bundled packer, configured from settings.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let merger = StagingMerger::new(NativeExtractor::new(), config.staging_root.clone());
        let composer = InstallerComposer::new(
            SfxToolkit::new(config.sfx_tools_dir.clone()),
            SevenZipCompressor::new(),
            config.staging_root.clone(),
        );
        Self::new(merger, composer)
    }
}
