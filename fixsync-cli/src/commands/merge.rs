//! Merge command - repackage local fix packages without network access.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::Args;
use fixsync::archive::{parse_archive_key, ArchiveKey};
use fixsync::config::ConfigFile;
use fixsync::staging::{
    InstallerComposer, NativeExtractor, Repackage, Repackager, SevenZipCompressor, SfxToolkit,
    StagingMerger,
};

use super::common::dir_or;
use crate::error::CliError;
use crate::ui::ConsoleProgress;

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Directory holding the fix archives (default: paths.download_dir)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Where to write the installer (default: paths.sfx_output_dir)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Directory with 7z.exe, 7z.dll and 7zS.sfx (default: paths.sfx_tools_dir)
    #[arg(long)]
    pub tools: Option<PathBuf>,

    /// Only merge these archives, given as family_sequence (repeatable)
    #[arg(long = "only", value_name = "KEY")]
    pub only: Vec<String>,
}

pub fn run(args: MergeArgs) -> Result<(), CliError> {
    let config = ConfigFile::load()?;

    let source = args
        .dir
        .or(config.paths.download_dir.clone())
        .ok_or_else(|| CliError::Config("No source directory: pass --dir or set paths.download_dir".to_string()))?;
    let output = dir_or(
        args.output.or(config.paths.sfx_output_dir.clone()),
        &source,
    );
    let tools = args.tools.or(config.paths.sfx_tools_dir.clone());

    let selection = parse_selection(&args.only)?;

    let scratch = std::env::temp_dir();
    let repackager = Repackager::new(
        StagingMerger::new(NativeExtractor::new(), scratch.clone()),
        InstallerComposer::new(SfxToolkit::new(tools), SevenZipCompressor::new(), scratch),
    );

    let reports = repackager.repackage(
        &source,
        selection.as_ref(),
        &output,
        &ConsoleProgress::reporter(),
    )?;

    if reports.is_empty() {
        println!("No fix archives found in {}", source.display());
        return Ok(());
    }
    for report in reports {
        println!();
        println!("Family:    {}", report.family);
        println!("Fixes:     {}", report.label);
        println!("Installer: {}", report.installer.path.display());
        println!("Size:      {} bytes", report.installer.size_bytes);
        println!("SHA-256:   {}", report.installer.sha256);
    }
    Ok(())
}

/// Keys from `--only` values; `None` when no filter was given.
fn parse_selection(values: &[String]) -> Result<Option<HashSet<ArchiveKey>>, CliError> {
    if values.is_empty() {
        return Ok(None);
    }
    values
        .iter()
        .map(|v| {
            parse_archive_key(v)
                .map_err(|e| CliError::Config(format!("Invalid archive key '{}': {}", v, e)))
        })
        .collect::<Result<HashSet<_>, _>>()
        .map(Some)
}
