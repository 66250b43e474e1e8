//! Progress and status events emitted by the pipeline.
//!
//! Every long-running operation takes a [`Reporter`] and pushes
//! user-facing messages through it. The reporter forwards each event to an
//! optional [`EventSink`] supplied by the host (the CLI renders them, tests
//! collect them) and mirrors messages into `tracing`.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::discovery::{DistroKind, DownloadState};
use crate::reconcile::FixState;
use crate::transfer::TransferProgress;

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

/// One event emitted by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Free-form status line.
    Message { level: EventLevel, text: String },
    /// The reconciliation pass entered a new phase.
    Phase(String),
    /// Bytes arrived for a named download.
    Transfer {
        name: String,
        progress: TransferProgress,
    },
    /// A tracked fix package changed state.
    FixStateChanged { name: String, state: FixState },
    /// A distribution image changed state.
    DistroStateChanged {
        kind: DistroKind,
        file_name: String,
        state: DownloadState,
    },
}

/// Host-supplied callback receiving pipeline events.
pub type EventSink = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Cheap handle for emitting events.
#[derive(Clone, Default)]
pub struct Reporter {
    sink: Option<EventSink>,
}

impl Reporter {
    /// Reporter that forwards to `sink`.
    pub fn new(sink: EventSink) -> Self {
        Self { sink: Some(sink) }
    }

    /// Reporter that only logs.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Forward an event to the sink without logging.
    pub fn emit(&self, event: PipelineEvent) {
        if let Some(sink) = &self.sink {
            sink(event);
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        let text = text.into();
        info!("{}", text);
        self.message(EventLevel::Info, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        let text = text.into();
        warn!("{}", text);
        self.message(EventLevel::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        let text = text.into();
        error!("{}", text);
        self.message(EventLevel::Error, text);
    }

    /// Announce a new pass phase.
    pub fn phase(&self, label: impl Into<String>) {
        let label = label.into();
        info!(phase = %label, "phase");
        self.emit(PipelineEvent::Phase(label));
    }

    fn message(&self, level: EventLevel, text: String) {
        self.emit(PipelineEvent::Message { level, text });
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
