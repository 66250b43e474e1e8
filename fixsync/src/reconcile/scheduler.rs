//! Timer-driven reconciliation.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use super::reconciler::Reconciler;
use super::state::PassOutcome;

enum Command {
    Trigger,
    Stop,
}

/// Handle to the background worker running passes on a timer.
///
/// Dropping the handle stops the worker after any pass in progress.
pub struct SchedulerHandle {
    tx: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Start the worker; the first pass runs after `interval`, or at once
    /// when `run_immediately` is set.
    pub fn spawn<F>(
        reconciler: Arc<Reconciler>,
        interval: Duration,
        run_immediately: bool,
        on_pass: F,
    ) -> io::Result<Self>
    where
        F: Fn(&PassOutcome) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        if run_immediately {
            let _ = tx.send(Command::Trigger);
        }

        let worker = thread::Builder::new()
            .name("fixsync-scheduler".to_string())
            .spawn(move || {
                info!(interval_secs = interval.as_secs(), "scheduler started");
                loop {
                    match rx.recv_timeout(interval) {
                        Ok(Command::Trigger) | Err(RecvTimeoutError::Timeout) => {}
                        Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    if let Some(outcome) = run_guarded(&reconciler) {
                        on_pass(&outcome);
                    }

                    // Triggers that arrived while the pass ran are dropped.
                    loop {
                        match rx.try_recv() {
                            Ok(Command::Trigger) => debug!("trigger dropped, pass was running"),
                            Ok(Command::Stop) | Err(TryRecvError::Disconnected) => {
                                info!("scheduler stopped");
                                return;
                            }
                            Err(TryRecvError::Empty) => break,
                        }
                    }
                }
                info!("scheduler stopped");
            })?;

        Ok(Self {
            tx,
            worker: Some(worker),
        })
    }

    /// Request a pass now. Ignored when one is already running.
    pub fn trigger(&self) {
        let _ = self.tx.send(Command::Trigger);
    }

    /// Stop the worker and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.tx.send(Command::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run a pass; a panic is recorded as a failed pass instead of ending the worker.
fn run_guarded(reconciler: &Reconciler) -> Option<PassOutcome> {
    match panic::catch_unwind(AssertUnwindSafe(|| reconciler.run_pass())) {
        Ok(outcome) => outcome,
        Err(_) => {
            reconciler.record_failure("reconciliation pass aborted unexpectedly");
            None
        }
    }
}
