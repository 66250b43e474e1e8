//! Terminal rendering of pipeline events.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use fixsync::events::{EventLevel, PipelineEvent, Reporter};
use fixsync::reconcile::FixState;
use fixsync::transfer::TransferProgress;
use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.green} {msg:30!} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg:30!} {bytes} ({bytes_per_sec})";

/// Prints timestamped messages and one progress bar per active download.
pub struct ConsoleProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    /// Reporter forwarding every event to a shared console renderer.
    pub fn reporter() -> Reporter {
        let console = Arc::new(Self::new());
        Reporter::new(Arc::new(move |event| console.handle(event)))
    }

    pub fn handle(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Message { level, text } => self.print(level, &text),
            PipelineEvent::Phase(label) => tracing::debug!(phase = %label, "phase"),
            PipelineEvent::Transfer { name, progress } => self.update(&name, progress),
            PipelineEvent::FixStateChanged { name, state } => {
                if matches!(state, FixState::Done | FixState::Cancelled | FixState::Failed) {
                    self.finish(&name);
                }
            }
            PipelineEvent::DistroStateChanged {
                file_name, state, ..
            } => {
                if state.is_terminal() {
                    self.finish(&file_name);
                }
            }
        }
    }

    fn print(&self, level: EventLevel, text: &str) {
        let prefix = match level {
            EventLevel::Info => "",
            EventLevel::Warning => "warning: ",
            EventLevel::Error => "error: ",
        };
        let line = format!("[{}] {}{}", Local::now().format("%H:%M:%S"), prefix, text);
        if self.multi.println(&line).is_err() {
            println!("{}", line);
        }
    }

    fn update(&self, name: &str, progress: TransferProgress) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        let bar = bars
            .entry(name.to_string())
            .or_insert_with(|| self.multi.add(new_bar(name, progress.total)));
        if let Some(total) = progress.total {
            if bar.length() != Some(total) {
                bar.set_length(total);
            }
        }
        bar.set_position(progress.received);
    }

    fn finish(&self, name: &str) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        if let Some(bar) = bars.remove(name) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}

fn new_bar(name: &str, total: Option<u64>) -> ProgressBar {
    let (bar, template) = match total {
        Some(len) => (ProgressBar::new(len), BAR_TEMPLATE),
        None => (ProgressBar::new_spinner(), SPINNER_TEMPLATE),
    };
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(name.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Human-readable size, or `unknown`.
pub fn format_size(bytes: Option<u64>) -> String {
    bytes.map_or_else(|| "unknown".to_string(), |b| HumanBytes(b).to_string())
}
