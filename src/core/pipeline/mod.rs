//! Drives sampled frames through recognition and the text filters, on a
//! worker thread with cooperative cancellation.

pub mod driver;
pub mod events;
pub mod worker;

pub use driver::{run, ExtractionResult, PipelineDriver};
pub use events::{
    CallbackEvents, CancelToken, ChannelEvents, LogEvent, LogLevel, NoEvents, PipelineEvent,
    PipelineEvents,
};
pub use worker::{ExtractionHandle, ExtractionWorker};
