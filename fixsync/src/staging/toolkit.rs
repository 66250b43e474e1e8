//! Bundled self-extractor helpers.
//!
//! An installer needs five helpers: the packer (`7z.exe`) and its runtime
//! library (`7z.dll`), the self-extracting stub (`7zS.sfx`), the stub's
//! configuration block (`config.txt`) and the script the stub launches
//! (`run.cmd`). The two text helpers are embedded in the binary; the three
//! binary helpers come from the configured tools directory. A text helper
//! placed in the tools directory overrides the embedded copy.

use std::fs;
use std::path::{Path, PathBuf};

use rust_embed::RustEmbed;
use tracing::debug;

use super::batch::{StagingBatch, TOOLS_PREFIX};
use super::CompositionError;

pub const PACKER: &str = "7z.exe";
pub const PACKER_LIBRARY: &str = "7z.dll";
pub const SFX_STUB: &str = "7zS.sfx";
pub const SFX_CONFIG: &str = "config.txt";
pub const RUN_SCRIPT: &str = "run.cmd";

const BINARY_HELPERS: [&str; 3] = [PACKER, PACKER_LIBRARY, SFX_STUB];
const TEXT_HELPERS: [&str; 2] = [SFX_CONFIG, RUN_SCRIPT];

#[derive(RustEmbed)]
#[folder = "assets/sfx/"]
struct EmbeddedHelpers;

/// Helpers copied into a private tools directory for one build.
///
/// Dropping this removes the directory.
#[derive(Debug)]
pub struct PreparedTools {
    batch: StagingBatch,
}

impl PreparedTools {
    pub fn dir(&self) -> &Path {
        self.batch.path()
    }

    pub fn packer(&self) -> PathBuf {
        self.dir().join(PACKER)
    }

    pub fn sfx_stub(&self) -> PathBuf {
        self.dir().join(SFX_STUB)
    }

    pub fn sfx_config(&self) -> PathBuf {
        self.dir().join(SFX_CONFIG)
    }

    pub fn run_script(&self) -> PathBuf {
        self.dir().join(RUN_SCRIPT)
    }
}

/// Locates helpers and materializes them per build.
#[derive(Debug, Clone)]
pub struct SfxToolkit {
    tools_dir: Option<PathBuf>,
}

impl SfxToolkit {
    pub fn new(tools_dir: Option<PathBuf>) -> Self {
        Self { tools_dir }
    }

    fn configured(&self, name: &str) -> Option<PathBuf> {
        self.tools_dir
            .as_ref()
            .map(|dir| dir.join(name))
            .filter(|p| p.is_file())
    }

    /// Names of helpers that cannot be found.
    pub fn missing(&self) -> Vec<&'static str> {
        let binaries = BINARY_HELPERS
            .into_iter()
            .filter(|name| self.configured(name).is_none());
        let texts = TEXT_HELPERS
            .into_iter()
            .filter(|name| self.configured(name).is_none() && EmbeddedHelpers::get(name).is_none());
        binaries.chain(texts).collect()
    }

    /// Copy every helper into a fresh tools directory under `root`.
    pub fn prepare(&self, root: &Path) -> Result<PreparedTools, CompositionError> {
        let batch =
            StagingBatch::create(root, TOOLS_PREFIX).map_err(|e| CompositionError::Io {
                path: root.to_path_buf(),
                source: e,
            })?;

        for name in BINARY_HELPERS {
            let source = self
                .configured(name)
                .ok_or(CompositionError::MissingResource(name))?;
            copy_helper(&source, &batch.path().join(name))?;
        }

        for name in TEXT_HELPERS {
            let target = batch.path().join(name);
            if let Some(source) = self.configured(name) {
                copy_helper(&source, &target)?;
                continue;
            }
            let embedded =
                EmbeddedHelpers::get(name).ok_or(CompositionError::MissingResource(name))?;
            fs::write(&target, embedded.data.as_ref()).map_err(|e| CompositionError::Io {
                path: target.clone(),
                source: e,
            })?;
        }

        debug!(dir = %batch.path().display(), "prepared installer helpers");
        Ok(PreparedTools { batch })
    }
}

fn copy_helper(source: &Path, target: &Path) -> Result<(), CompositionError> {
    fs::copy(source, target)
        .map(|_| ())
        .map_err(|e| CompositionError::Io {
            path: source.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tools_dir(temp: &TempDir) -> PathBuf {
        let dir = temp.path().join("tools");
        fs::create_dir_all(&dir).unwrap();
        for name in BINARY_HELPERS {
            fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
        dir
    }

    #[test]
    fn test_embedded_text_helpers_exist() {
        let config = EmbeddedHelpers::get(SFX_CONFIG).unwrap();
        assert!(String::from_utf8_lossy(&config.data).contains("RunProgram=\"run.cmd\""));
        assert!(EmbeddedHelpers::get(RUN_SCRIPT).is_some());
    }

    #[test]
    fn test_prepare_copies_all_helpers() {
        let temp = TempDir::new().unwrap();
        let toolkit = SfxToolkit::new(Some(tools_dir(&temp)));
        assert!(toolkit.missing().is_empty());

        let tools = toolkit.prepare(temp.path()).unwrap();
        assert_eq!(fs::read(tools.sfx_stub()).unwrap(), SFX_STUB.as_bytes());
        assert!(tools.sfx_config().is_file());
        assert!(tools.run_script().is_file());

        let dir = tools.dir().to_path_buf();
        drop(tools);
        assert!(!dir.exists());
    }

    #[test]
    fn test_configured_text_helper_wins() {
        let temp = TempDir::new().unwrap();
        let dir = tools_dir(&temp);
        fs::write(dir.join(SFX_CONFIG), b"custom").unwrap();

        let tools = SfxToolkit::new(Some(dir)).prepare(temp.path()).unwrap();
        assert_eq!(fs::read(tools.sfx_config()).unwrap(), b"custom");
    }

    #[test]
    fn test_missing_binary_helper_fails_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let dir = tools_dir(&temp);
        fs::remove_file(dir.join(PACKER_LIBRARY)).unwrap();

        let toolkit = SfxToolkit::new(Some(dir));
        assert_eq!(toolkit.missing(), vec![PACKER_LIBRARY]);

        let err = toolkit.prepare(temp.path()).unwrap_err();
        assert!(matches!(err, CompositionError::MissingResource(PACKER_LIBRARY)));

        let leftovers = fs::read_dir(temp.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(TOOLS_PREFIX))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_no_tools_dir_reports_binaries_missing() {
        let toolkit = SfxToolkit::new(None);
        assert_eq!(toolkit.missing(), BINARY_HELPERS.to_vec());
    }
}
