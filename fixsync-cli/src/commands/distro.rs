//! Distro command - find the newest distribution image on the FTP mirror.

use std::fs;

use clap::{Args, ValueEnum};
use fixsync::discovery::{
    DistroDiscovery, DistroKind, DownloadState, FtpDiscovery, SuppaFtpLister,
};
use fixsync::events::PipelineEvent;
use fixsync::transfer::{Transfer, TransferClient, TransferProgress, TransferRequest};
use tokio_util::sync::CancellationToken;

use super::common::{load_pipeline_config, print_distros};
use crate::error::CliError;
use crate::ui::ConsoleProgress;

/// Distribution line selection.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DistroLine {
    /// Main (OE) image
    Oe,
    /// Industrial (Prom) image
    Prom,
}

impl From<DistroLine> for DistroKind {
    fn from(line: DistroLine) -> Self {
        match line {
            DistroLine::Oe => DistroKind::Oe,
            DistroLine::Prom => DistroKind::Prom,
        }
    }
}

#[derive(Debug, Args)]
pub struct DistroArgs {
    /// Which image to look up
    #[arg(value_enum)]
    pub line: DistroLine,

    /// Download the image into its configured directory
    #[arg(long)]
    pub download: bool,
}

pub fn run(args: DistroArgs) -> Result<(), CliError> {
    let config = load_pipeline_config()?;
    let kind = DistroKind::from(args.line);
    let source = config.distro(kind).ok_or_else(|| {
        CliError::Config(format!(
            "No FTP address configured for {}. Set {}.",
            kind,
            kind.url_key()
        ))
    })?;

    let reporter = ConsoleProgress::reporter();
    let discovery = FtpDiscovery::new(
        SuppaFtpLister::new(config.timeout),
        &source.ftp_url,
        &config.distro_subdir,
        kind,
    );
    let Some(artifact) = discovery.discover(&reporter) else {
        println!("No {} distribution found.", kind);
        return Ok(());
    };
    print_distros(std::slice::from_ref(&artifact));

    if !args.download {
        return Ok(());
    }

    let target = source.target_dir.join(&artifact.file_name);
    if target.exists() {
        println!("Already present: {}", target.display());
        return Ok(());
    }
    fs::create_dir_all(&source.target_dir)?;

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let client = TransferClient::from_config(&config)?;
    let name = artifact.file_name.clone();
    let progress_reporter = reporter.clone();
    let progress = move |p: TransferProgress| {
        progress_reporter.emit(PipelineEvent::Transfer {
            name: name.clone(),
            progress: p,
        })
    };

    let result = client.download(
        &TransferRequest::from(&artifact),
        &source.target_dir,
        &progress,
        &cancel,
    );
    let state = match &result {
        Ok(_) => DownloadState::Done,
        Err(e) if e.is_cancelled() => DownloadState::Cancelled,
        Err(_) => DownloadState::Failed,
    };
    reporter.emit(PipelineEvent::DistroStateChanged {
        kind,
        file_name: artifact.file_name.clone(),
        state,
    });

    let path = result?;
    println!("Saved {}", path.display());
    Ok(())
}
