//! Signals that cross the worker boundary: cancellation in, progress and log
//! events out.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use super::driver::ExtractionResult;

/// Cooperative cancel flag, checked by the driver between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
}

impl LogEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            message: message.into(),
        }
    }
}

/// Observer for one run. All methods are called from the driver's thread,
/// in emission order.
pub trait PipelineEvents {
    /// The source is open. `expected_frames` is `None` when its length is unknown.
    fn on_started(&mut self, _expected_frames: Option<u64>) {}

    /// Frames consumed so far; called once per frame.
    fn on_progress(&mut self, _frames_processed: u64) {}

    /// A frame produced an accepted line.
    fn on_line(&mut self, _timestamp: f64, _text: &str) {}

    fn on_log(&mut self, _event: LogEvent) {}
}

/// Discards every event.
pub struct NoEvents;

impl PipelineEvents for NoEvents {}

/// Everything a worker reports, in order.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Started { expected_frames: Option<u64> },
    Progress(u64),
    Line { timestamp: f64, text: String },
    Log(LogEvent),
    Finished(ExtractionResult),
    Failed(String),
}

/// Forwards events into a channel. A dropped receiver is ignored; the run
/// still completes and returns its result.
pub struct ChannelEvents {
    sender: Sender<PipelineEvent>,
}

impl ChannelEvents {
    pub fn new(sender: Sender<PipelineEvent>) -> Self {
        Self { sender }
    }
}

impl PipelineEvents for ChannelEvents {
    fn on_started(&mut self, expected_frames: Option<u64>) {
        let _ = self.sender.send(PipelineEvent::Started { expected_frames });
    }

    fn on_progress(&mut self, frames_processed: u64) {
        let _ = self.sender.send(PipelineEvent::Progress(frames_processed));
    }

    fn on_line(&mut self, timestamp: f64, text: &str) {
        let _ = self.sender.send(PipelineEvent::Line {
            timestamp,
            text: text.to_string(),
        });
    }

    fn on_log(&mut self, event: LogEvent) {
        let _ = self.sender.send(PipelineEvent::Log(event));
    }
}

/// Adapts a progress callback and a line callback.
pub struct CallbackEvents<P, L> {
    on_progress: P,
    on_line: L,
}

impl<P, L> CallbackEvents<P, L>
where
    P: FnMut(u64),
    L: FnMut(f64, &str),
{
    pub fn new(on_progress: P, on_line: L) -> Self {
        Self { on_progress, on_line }
    }
}

impl<P, L> PipelineEvents for CallbackEvents<P, L>
where
    P: FnMut(u64),
    L: FnMut(f64, &str),
{
    fn on_progress(&mut self, frames_processed: u64) {
        (self.on_progress)(frames_processed);
    }

    fn on_line(&mut self, timestamp: f64, text: &str) {
        (self.on_line)(timestamp, text);
    }
}
