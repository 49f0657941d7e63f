use log::{error, info};
use std::sync::mpsc::{self, Receiver, TryIter};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::driver::{ExtractionResult, PipelineDriver};
use super::events::{CancelToken, ChannelEvents, PipelineEvent, PipelineEvents};
use crate::core::config::ExtractionConfig;
use crate::core::error::{ExtractError, SourceError};
use crate::core::ocr::TextRecognizer;
use crate::core::video::{sample, FrameDecoder};

const WORKER_THREAD_NAME: &str = "hardsub-extract";

/// Starts extraction runs on a dedicated thread.
pub struct ExtractionWorker;

impl ExtractionWorker {
    /// `open_source` runs on the worker thread, so a slow probe does not block
    /// the caller. If it fails the run ends with `SourceUnavailable` before any
    /// frame is seen.
    pub fn spawn<F, D>(
        open_source: F,
        recognizer: Arc<dyn TextRecognizer>,
        config: ExtractionConfig,
    ) -> Result<ExtractionHandle, ExtractError>
    where
        F: FnOnce() -> Result<D, SourceError> + Send + 'static,
        D: FrameDecoder + 'static,
    {
        config.validate()?;

        let cancel = CancelToken::new();
        let (sender, receiver) = mpsc::channel();
        let worker_cancel = cancel.clone();

        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut events = ChannelEvents::new(sender.clone());
                let outcome = match open_source() {
                    Ok(decoder) => {
                        let frames = sample(decoder, config.interval_ms);
                        let expected_frames = frames.expected_frames();
                        info!(
                            "🎞️ Sampling every {} ms, expecting {:?} frames",
                            config.interval_ms, expected_frames
                        );
                        events.on_started(expected_frames);
                        let mut driver = PipelineDriver::new(&config);
                        Ok(driver.run(frames, recognizer.as_ref(), &worker_cancel, &mut events))
                    }
                    Err(e) => {
                        error!("❌ Cannot open frame source: {}", e);
                        Err(ExtractError::SourceUnavailable(e))
                    }
                };

                let last = match &outcome {
                    Ok(result) => PipelineEvent::Finished(result.clone()),
                    Err(e) => PipelineEvent::Failed(e.to_string()),
                };
                let _ = sender.send(last);
                outcome
            })
            .map_err(ExtractError::Spawn)?;

        info!("🧵 Extraction worker started");
        Ok(ExtractionHandle {
            cancel,
            receiver,
            thread: Some(thread),
        })
    }
}

/// Controls one in-flight run. Dropping the handle detaches the worker; the
/// run still finishes on its own.
pub struct ExtractionHandle {
    cancel: CancelToken,
    receiver: Receiver<PipelineEvent>,
    thread: Option<JoinHandle<Result<ExtractionResult, ExtractError>>>,
}

impl ExtractionHandle {
    /// Ask the worker to stop at the next frame boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Blocking iterator over events; ends after the worker's final event.
    pub fn events(&self) -> impl Iterator<Item = PipelineEvent> + '_ {
        self.receiver.iter()
    }

    /// Events already emitted, without waiting.
    pub fn try_events(&self) -> TryIter<'_, PipelineEvent> {
        self.receiver.try_iter()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the worker and take its result.
    pub fn join(mut self) -> Result<ExtractionResult, ExtractError> {
        let thread = self.thread.take().ok_or(ExtractError::WorkerPanicked)?;
        thread.join().map_err(|_| ExtractError::WorkerPanicked)?
    }
}
