//! Archive naming conventions and local inventory.
//!
//! This module is the single source of truth for how fix package archives
//! are identified:
//! - Parsing a filename into an [`ArchiveKey`] (`naming`)
//! - Collapsing sequence numbers into an output label (`range`)
//! - Ordering dotted version strings (`version`)
//! - Deriving the set of keys already present in a directory (`inventory`)
//!
//! Everything here is pure string work except [`LocalInventory::scan`],
//! which reads a directory listing.

mod inventory;
mod naming;
mod range;
mod version;

pub use inventory::LocalInventory;
pub use naming::{canonical_file_name, parse_archive_key, ArchiveKey, ParsedArchive};
pub use range::{format_sequence_range, EMPTY_RANGE_LABEL, MAX_RANGE_LABEL_LEN};
pub use version::{compare_versions, find_version, is_valid_version};

use std::path::Path;

/// Archive formats used by fix packages and distribution images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// ZIP archive (`.zip`).
    Zip,
    /// RAR archive (`.rar`).
    Rar,
}

impl ArchiveFormat {
    /// All supported formats.
    pub const ALL: [ArchiveFormat; 2] = [ArchiveFormat::Zip, ArchiveFormat::Rar];

    /// Lowercase extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Rar => "rar",
        }
    }

    /// Detect the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    /// Detect the format from a path or filename.
    ///
    /// ```
    /// use fixsync::archive::ArchiveFormat;
    ///
    /// assert_eq!(ArchiveFormat::from_path("kpe_25.1.1.1_3.ZIP"), Some(ArchiveFormat::Zip));
    /// assert_eq!(ArchiveFormat::from_path("readme.txt"), None);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
