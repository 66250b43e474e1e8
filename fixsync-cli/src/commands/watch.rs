//! Watch command - timer-driven checks until Ctrl+C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Args;
use fixsync::config::check_interval_from_minutes;
use fixsync::reconcile::{Reconciler, SchedulerHandle};

use super::common::{load_pipeline_config, print_outcome};
use crate::error::CliError;
use crate::ui::ConsoleProgress;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Minutes between checks (overrides automation.check_interval_minutes)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Wait one interval before the first check
    #[arg(long)]
    pub delay_first: bool,
}

pub fn run(args: WatchArgs) -> Result<(), CliError> {
    let mut config = load_pipeline_config()?;
    if !config.auto_check && args.interval.is_none() {
        return Err(CliError::Config(
            "Periodic checks are disabled (automation.auto_check = false). \
             Enable them or pass --interval."
                .to_string(),
        ));
    }
    if let Some(minutes) = args.interval {
        config.check_interval = check_interval_from_minutes(minutes);
    }
    let interval = config.check_interval;
    let reconciler = Arc::new(Reconciler::from_config(config, ConsoleProgress::reporter())?);

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_shutdown = Arc::clone(&shutdown);
    let handler_target = Arc::clone(&reconciler);
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Stopping...");
        handler_shutdown.store(true, Ordering::SeqCst);
        handler_target.cancel_all();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    println!(
        "Checking every {} minute(s). Press Ctrl+C to stop.",
        interval.as_secs() / 60
    );

    let scheduler = SchedulerHandle::spawn(
        Arc::clone(&reconciler),
        interval,
        !args.delay_first,
        |outcome| print_outcome(outcome),
    )?;

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }
    scheduler.stop();

    if let Some(checked) = reconciler.status().last_checked {
        println!("Last checked: {}", checked.format("%Y-%m-%d %H:%M:%S"));
    }
    Ok(())
}
