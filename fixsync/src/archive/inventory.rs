//! Local inventory of already-downloaded archives.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use super::naming::{ArchiveKey, ParsedArchive};

/// Keys and filenames already present in a directory.
///
/// Recomputed on every reconciliation pass and never persisted; it exists
/// only to diff discovery results against what is on disk.
#[derive(Debug, Clone, Default)]
pub struct LocalInventory {
    keys: BTreeSet<ArchiveKey>,
    file_names: HashSet<String>,
}

impl LocalInventory {
    /// Scan a directory (non-recursively).
    ///
    /// A missing directory yields an empty inventory.
    pub fn scan(dir: &Path) -> io::Result<Self> {
        let mut inventory = Self::default();

        if !dir.exists() {
            debug!(dir = %dir.display(), "inventory directory does not exist yet");
            return Ok(inventory);
        }

        for entry in fs::read_dir(dir)?.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                inventory.file_names.insert(name.to_lowercase());
            }
            if let Some(parsed) = ParsedArchive::from_path(path) {
                inventory.keys.insert(parsed.key);
            }
        }

        debug!(
            dir = %dir.display(),
            keys = inventory.keys.len(),
            files = inventory.file_names.len(),
            "scanned local inventory"
        );
        Ok(inventory)
    }

    /// Build an inventory from filenames (used when no directory is involved).
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut inventory = Self::default();
        for name in names {
            inventory.file_names.insert(name.to_lowercase());
            if let Some(parsed) = ParsedArchive::from_path(name) {
                inventory.keys.insert(parsed.key);
            }
        }
        inventory
    }

    /// Whether an archive with this key is present.
    pub fn contains_key(&self, key: &ArchiveKey) -> bool {
        self.keys.contains(key)
    }

    /// Whether a file with this exact name (case-insensitive) is present.
    pub fn contains_file_name(&self, name: &str) -> bool {
        self.file_names.contains(&name.to_lowercase())
    }

    /// All parsed keys, in merge order.
    pub fn keys(&self) -> impl Iterator<Item = &ArchiveKey> {
        self.keys.iter()
    }

    /// Number of parsed keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no archive keys were found.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let inventory = LocalInventory::scan(Path::new("/nonexistent/fixsync/dir")).unwrap();
        assert!(inventory.is_empty());
    }

    #[test]
    fn test_scan_collects_keys_by_parsed_name() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kpe_25.1.1.1_3.zip"), b"a").unwrap();
        fs::write(temp.path().join("kpe_25.1.1.1_##4__.rar"), b"b").unwrap();
        fs::write(temp.path().join("notes.txt"), b"c").unwrap();
        fs::create_dir(temp.path().join("kpe_25.1.1.1_9.zip")).unwrap();

        let inventory = LocalInventory::scan(temp.path()).unwrap();

        assert_eq!(inventory.len(), 2);
        assert!(inventory.contains_key(&ArchiveKey::new("kpe_25.1.1.1", 3)));
        assert!(inventory.contains_key(&ArchiveKey::new("kpe_25.1.1.1", 4)));
        assert!(!inventory.contains_key(&ArchiveKey::new("kpe_25.1.1.1", 9)));
        assert!(inventory.contains_file_name("NOTES.txt"));
    }

    #[test]
    fn test_differently_named_duplicate_matches_by_key() {
        let inventory = LocalInventory::from_names(["kpe_25.1.1.1_5.zip"]);
        let discovered = ParsedArchive::from_path("kpe_25.1.1.1_fix5.zip").unwrap();
        assert!(inventory.contains_key(&discovered.key));
        assert!(!inventory.contains_file_name("kpe_25.1.1.1_fix5.zip"));
    }
}
