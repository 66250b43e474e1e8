//! Init command - write a starter configuration file.

use std::path::PathBuf;

use clap::Args;
use fixsync::config::{config_file_path, ConfigFile, PipelineConfig};

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory for downloaded fix packages
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Directory holding 7z.exe, 7z.dll and 7zS.sfx
    #[arg(long)]
    pub tools_dir: Option<PathBuf>,

    /// Replace an existing configuration with defaults
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<(), CliError> {
    let path = config_file_path();
    let mut config = if args.force || !path.exists() {
        ConfigFile::default()
    } else {
        ConfigFile::load()?
    };

    if args.download_dir.is_some() {
        config.paths.download_dir = args.download_dir;
    }
    if args.tools_dir.is_some() {
        config.paths.sfx_tools_dir = args.tools_dir;
    }
    config.save()?;

    println!("Configuration file: {}", path.display());
    match PipelineConfig::from_config_file(&config) {
        Ok(_) => println!("Configuration is complete."),
        Err(e) => {
            println!("Still to configure: {}", e);
            println!("Use 'fixsync config set <section.key> <value>' to finish setup.");
        }
    }
    Ok(())
}
