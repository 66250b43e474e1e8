//! Check command - one manual reconciliation pass.

use std::sync::Arc;

use clap::Args;
use fixsync::reconcile::Reconciler;

use super::common::{load_pipeline_config, print_distros, print_fixes, print_outcome, print_status};
use crate::error::CliError;
use crate::ui::ConsoleProgress;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Download every new fix package after the check
    #[arg(long)]
    pub download: bool,

    /// Do not build an installer after downloading
    #[arg(long)]
    pub no_sfx: bool,
}

pub fn run(args: CheckArgs) -> Result<(), CliError> {
    let mut config = load_pipeline_config()?;
    if args.no_sfx {
        config.auto_sfx = false;
    }
    let reconciler = Arc::new(Reconciler::from_config(config, ConsoleProgress::reporter())?);

    let handler_target = Arc::clone(&reconciler);
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Cancelling downloads...");
        handler_target.cancel_all();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let Some(mut outcome) = reconciler.run_pass() else {
        return Err(CliError::Config("A check is already running".to_string()));
    };

    if args.download && outcome.downloaded.is_empty() {
        reconciler.select_all(true);
        if let Some(result) = reconciler.download_selected() {
            let run = result?;
            outcome.downloaded = run.downloaded;
            outcome.installers = run.installers;
        }
    }

    println!();
    print_fixes(&reconciler.fixes());
    print_distros(&reconciler.distros());
    print_outcome(&outcome);
    print_status(&reconciler.status());
    Ok(())
}
