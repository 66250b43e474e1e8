//! Helpers shared by the pipeline commands.

use std::path::{Path, PathBuf};

use fixsync::config::{config_file_path, ConfigFile, PipelineConfig};
use fixsync::discovery::DistroArtifact;
use fixsync::reconcile::{FixEntry, LoopStatus, PassOutcome};

use crate::error::CliError;
use crate::ui::format_size;

/// Load the config file and resolve it, failing before any network access.
pub fn load_pipeline_config() -> Result<PipelineConfig, CliError> {
    let file = ConfigFile::load()?;
    PipelineConfig::from_config_file(&file).map_err(|e| {
        CliError::Config(format!(
            "{}. Edit {} or use 'fixsync config set'.",
            e,
            config_file_path().display()
        ))
    })
}

/// `dir` if given, else `fallback`.
pub fn dir_or(dir: Option<PathBuf>, fallback: &Path) -> PathBuf {
    dir.unwrap_or_else(|| fallback.to_path_buf())
}

pub fn print_fixes(entries: &[FixEntry]) {
    if entries.is_empty() {
        println!("No fix packages found.");
        return;
    }
    println!("Fix packages:");
    for entry in entries {
        let mark = if entry.selected { "*" } else { " " };
        println!("  {} {:<12} {}", mark, entry.state.to_string(), entry.name());
    }
}

pub fn print_distros(distros: &[DistroArtifact]) {
    for distro in distros {
        println!(
            "{} distribution: {} (version {}, size {}, {})",
            distro.kind,
            distro.file_name,
            distro.version,
            format_size(distro.size_bytes),
            distro.state
        );
    }
}

pub fn print_outcome(outcome: &PassOutcome) {
    if !outcome.downloaded.is_empty() {
        println!("Downloaded {} file(s).", outcome.downloaded.len());
    }
    for report in &outcome.installers {
        println!(
            "Installer {} ({} bytes, sha256 {})",
            report.installer.path.display(),
            report.installer.size_bytes,
            report.installer.sha256
        );
    }
    for path in &outcome.distro_files {
        println!("Distribution saved: {}", path.display());
    }
}

pub fn print_status(status: &LoopStatus) {
    if let Some(version) = &status.current_version {
        println!("Current version: {}", version);
    }
    if let Some(checked) = status.last_checked {
        println!("Last checked: {}", checked.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(error) = &status.last_error {
        println!("Last error: {}", error);
    }
}
