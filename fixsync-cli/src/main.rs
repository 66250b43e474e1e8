//! fixsync CLI - command-line front end for the fix package pipeline.

mod commands;
mod error;
mod ui;

use std::process;

use clap::{Parser, Subcommand};
use fixsync::config::ConfigFile;

use commands::check::CheckArgs;
use commands::config::ConfigCommands;
use commands::distro::DistroArgs;
use commands::init::InitArgs;
use commands::merge::MergeArgs;
use commands::watch::WatchArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "fixsync", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one reconciliation pass now
    Check(CheckArgs),

    /// Check periodically until interrupted
    Watch(WatchArgs),

    /// Repackage downloaded fix packages into an installer
    Merge(MergeArgs),

    /// Look up (and optionally download) a distribution image
    Distro(DistroArgs),

    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Create the configuration file
    Init(InitArgs),
}

fn main() {
    let cli = Cli::parse();

    let settings = ConfigFile::load().unwrap_or_default();
    let _log_guard = match fixsync::logging::init(&settings.logging, cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: {}", e);
            None
        }
    };

    if let Err(e) = run(cli.command) {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Check(args) => commands::check::run(args),
        Commands::Watch(args) => commands::watch::run(args),
        Commands::Merge(args) => commands::merge::run(args),
        Commands::Distro(args) => commands::distro::run(args),
        Commands::Config { command } => commands::config::run(command),
        Commands::Init(args) => commands::init::run(args),
    }
}
