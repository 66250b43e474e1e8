//! Merge selected fix archives and repackage each family as an installer.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::batch::{StagingBatch, STAGING_PREFIX};
use super::compose::{Compressor, InstallerComposer, InstallerReport, SevenZipCompressor};
use super::extract::{count_files_recursive, ArchiveExtractor, NativeExtractor};
use super::StagingError;
use crate::archive::{format_sequence_range, ArchiveFormat, ArchiveKey, ParsedArchive};
use crate::events::Reporter;

/// Installer file name for a family.
///
/// A run covering one family produces `FIX_<label>.exe`; when several
/// families are repackaged together each name is prefixed with its family
/// so the outputs never collide.
pub fn installer_file_name(family: &str, label: &str, multiple_families: bool) -> String {
    if multiple_families {
        format!("{}_FIX_{}.exe", family, label)
    } else {
        format!("FIX_{}.exe", label)
    }
}

/// Parse, filter and order the archives in `source_dir`.
///
/// Unparsable names are skipped with a warning; with a `selection` only
/// matching keys are kept. The result is sorted by `(family, sequence)`,
/// ties broken by file name.
pub fn collect_archives(
    source_dir: &Path,
    selection: Option<&HashSet<ArchiveKey>>,
    reporter: &Reporter,
) -> Result<Vec<ParsedArchive>, StagingError> {
    let entries = fs::read_dir(source_dir).map_err(|e| StagingError::Io {
        path: source_dir.to_path_buf(),
        source: e,
    })?;

    let mut archives = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || ArchiveFormat::from_path(&path).is_none() {
            continue;
        }
        let Some(parsed) = ParsedArchive::from_path(path.clone()) else {
            reporter.warn(format!(
                "Skipping archive with unrecognized name: {}",
                path.display()
            ));
            continue;
        };
        if selection.is_some_and(|keys| !keys.contains(&parsed.key)) {
            debug!(file = %parsed.file_name(), "not selected");
            continue;
        }
        archives.push(parsed);
    }

    archives.sort_by(|a, b| {
        a.key
            .cmp(&b.key)
            .then_with(|| a.file_name().cmp(&b.file_name()))
    });
    Ok(archives)
}

/// Rename archives to `family_sequence.ext` where that is safe.
///
/// A file already carrying its canonical name, or whose canonical name is
/// taken by another file, keeps its current name.
pub fn normalize_file_names(archives: &mut [ParsedArchive], reporter: &Reporter) {
    for archive in archives.iter_mut() {
        if archive.is_canonical() {
            continue;
        }
        let target = archive.canonical_path();
        if target.exists() {
            debug!(file = %archive.file_name(), "canonical name taken, keeping original");
            continue;
        }
        match fs::rename(&archive.path, &target) {
            Ok(()) => {
                debug!(from = %archive.file_name(), to = %target.display(), "renamed archive");
                archive.path = target;
            }
            Err(e) => reporter.warn(format!(
                "Could not rename {}: {}",
                archive.path.display(),
                e
            )),
        }
    }
}

/// Extracts ordered archives into one fresh staging directory.
pub struct StagingMerger<E = NativeExtractor> {
    extractor: E,
    staging_root: PathBuf,
}

impl<E: ArchiveExtractor> StagingMerger<E> {
    pub fn new(extractor: E, staging_root: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            staging_root: staging_root.into(),
        }
    }

    /// Extract `archives` in order; later archives overwrite earlier ones.
    ///
    /// The returned batch removes the staging tree when dropped.
    pub fn merge(
        &self,
        archives: &[ParsedArchive],
        reporter: &Reporter,
    ) -> Result<StagingBatch, StagingError> {
        let batch = StagingBatch::create(&self.staging_root, STAGING_PREFIX).map_err(|e| {
            StagingError::Io {
                path: self.staging_root.clone(),
                source: e,
            }
        })?;

        for archive in archives {
            reporter.info(format!("Extracting {}", archive.file_name()));
            self.extractor
                .extract(&archive.path, archive.format, batch.path())?;
        }

        let staged = count_files_recursive(batch.path())?;
        debug!(dir = %batch.path().display(), files = staged, "staging complete");
        Ok(batch)
    }
}

/// One installer produced for one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepackageReport {
    pub family: String,
    /// Distinct sequence numbers merged, ascending.
    pub sequences: Vec<u32>,
    pub label: String,
    pub installer: InstallerReport,
}

/// Merge+Compose over a directory of downloaded archives.
pub trait Repackage: Send + Sync {
    fn repackage(
        &self,
        source_dir: &Path,
        selection: Option<&HashSet<ArchiveKey>>,
        output_dir: &Path,
        reporter: &Reporter,
    ) -> Result<Vec<RepackageReport>, StagingError>;
}

/// [`Repackage`] built from a merger and a composer.
pub struct Repackager<E = NativeExtractor, C = SevenZipCompressor> {
    merger: StagingMerger<E>,
    composer: InstallerComposer<C>,
}

impl<E: ArchiveExtractor, C: Compressor> Repackager<E, C> {
    pub fn new(merger: StagingMerger<E>, composer: InstallerComposer<C>) -> Self {
        Self { merger, composer }
    }
}

impl<E: ArchiveExtractor, C: Compressor> Repackage for Repackager<E, C> {
    fn repackage(
        &self,
        source_dir: &Path,
        selection: Option<&HashSet<ArchiveKey>>,
        output_dir: &Path,
        reporter: &Reporter,
    ) -> Result<Vec<RepackageReport>, StagingError> {
        reporter.info("Processing archives");
        let mut archives = collect_archives(source_dir, selection, reporter)?;
        if archives.is_empty() {
            reporter.warn("No archives to process");
            return Ok(Vec::new());
        }
        normalize_file_names(&mut archives, reporter);

        let mut families: BTreeMap<String, Vec<ParsedArchive>> = BTreeMap::new();
        for archive in archives {
            families
                .entry(archive.key.family.clone())
                .or_default()
                .push(archive);
        }
        let multiple = families.len() > 1;

        fs::create_dir_all(output_dir).map_err(|e| StagingError::Io {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        let mut reports = Vec::with_capacity(families.len());
        for (family, group) in families {
            let batch = self.merger.merge(&group, reporter)?;

            let mut sequences: Vec<u32> = group.iter().map(|a| a.key.sequence).collect();
            sequences.dedup();
            let label = format_sequence_range(sequences.iter().copied());
            let output = output_dir.join(installer_file_name(&family, &label, multiple));

            let installer = self.composer.compose(batch.path(), &output, reporter)?;
            drop(batch);

            info!(family = %family, label = %label, path = %installer.path.display(), "repackaged fix packages");
            reports.push(RepackageReport {
                family,
                sequences,
                label,
                installer,
            });
        }
        Ok(reports)
    }
}
