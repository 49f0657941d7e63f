use log::{debug, info, warn};
use serde::Serialize;

use super::events::{CancelToken, LogEvent, PipelineEvents};
use crate::core::config::ExtractionConfig;
use crate::core::ocr::TextRecognizer;
use crate::core::subtitle::{AcceptedLine, Cue, CueGrouper, FrameNoiseGate};
use crate::core::video::{Roi, TimedFrame};

/// What one run produced. A cancelled run still carries everything accepted
/// before the cancel was observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub cues: Vec<Cue>,
    pub lines: Vec<String>,
    pub frames_processed: u64,
    pub recognizer_failures: u64,
    pub cancelled: bool,
}

/// Runs frames through recognizer, noise gate and grouper, strictly in order.
/// Owns all per-run state; nothing in here is shared with other threads.
pub struct PipelineDriver {
    roi: Option<Roi>,
    gate: FrameNoiseGate,
    grouper: CueGrouper,
    lines: Vec<String>,
    frames_processed: u64,
    recognizer_failures: u64,
}

impl PipelineDriver {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            roi: config.roi,
            gate: FrameNoiseGate::from_config(config),
            grouper: CueGrouper::new(config.group_threshold, config.cue_pad_seconds),
            lines: Vec::new(),
            frames_processed: 0,
            recognizer_failures: 0,
        }
    }

    pub fn reset(&mut self) {
        self.gate.reset();
        self.grouper.reset();
        self.lines.clear();
        self.frames_processed = 0;
        self.recognizer_failures = 0;
    }

    /// Consume `frames` until exhausted or `cancel` is set. The cancel flag is
    /// checked before each frame is pulled, so no frame is decoded or
    /// recognized after it is observed.
    pub fn run<I>(
        &mut self,
        frames: I,
        recognizer: &dyn TextRecognizer,
        cancel: &CancelToken,
        events: &mut dyn PipelineEvents,
    ) -> ExtractionResult
    where
        I: IntoIterator<Item = TimedFrame>,
    {
        self.reset();
        info!("▶️ Extraction started (recognizer: {})", recognizer.name());
        events.on_log(LogEvent::info("Extraction started"));

        let mut frames = frames.into_iter();
        let mut cancelled = false;
        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(frame) = frames.next() else {
                break;
            };
            self.process_frame(&frame, recognizer, events);
        }

        if cancelled {
            info!("⏹️ Extraction cancelled after {} frames", self.frames_processed);
            events.on_log(LogEvent::warn(format!(
                "Cancelled after {} frames",
                self.frames_processed
            )));
        }
        let result = self.finish(cancelled);
        info!(
            "✅ Extraction finished: {} frames, {} lines, {} cues",
            result.frames_processed,
            result.lines.len(),
            result.cues.len()
        );
        events.on_log(LogEvent::info(format!(
            "Done: {} frames, {} cues",
            result.frames_processed,
            result.cues.len()
        )));
        result
    }

    /// Handle one frame and report progress for it.
    pub fn process_frame(
        &mut self,
        frame: &TimedFrame,
        recognizer: &dyn TextRecognizer,
        events: &mut dyn PipelineEvents,
    ) -> Option<AcceptedLine> {
        let region = frame.region(self.roi.as_ref());
        let detections = match recognizer.recognize(&region) {
            Ok(detections) => detections,
            Err(e) => {
                self.recognizer_failures += 1;
                warn!("⚠️ Recognizer failed at {:.2}s: {}", frame.timestamp, e);
                events.on_log(LogEvent::warn(format!(
                    "Recognizer failed at {:.2}s: {}",
                    frame.timestamp, e
                )));
                Vec::new()
            }
        };

        let accepted = self.gate.accept_frame(frame.timestamp, &detections);
        if let Some(line) = &accepted {
            debug!("[{:.2}s] {}", line.timestamp, line.text);
            self.lines.push(line.text.clone());
            events.on_line(line.timestamp, &line.text);
            self.grouper.feed(line.timestamp, &line.text);
        }

        self.frames_processed += 1;
        events.on_progress(self.frames_processed);
        accepted
    }

    /// Close the open cue and hand back the run's output, leaving the driver
    /// empty.
    pub fn finish(&mut self, cancelled: bool) -> ExtractionResult {
        let result = ExtractionResult {
            cues: self.grouper.finish(),
            lines: std::mem::take(&mut self.lines),
            frames_processed: self.frames_processed,
            recognizer_failures: self.recognizer_failures,
            cancelled,
        };
        self.gate.reset();
        self.frames_processed = 0;
        self.recognizer_failures = 0;
        result
    }
}

/// One-shot run with a fresh driver.
pub fn run<I>(
    frames: I,
    recognizer: &dyn TextRecognizer,
    config: &ExtractionConfig,
    cancel: &CancelToken,
    events: &mut dyn PipelineEvents,
) -> ExtractionResult
where
    I: IntoIterator<Item = TimedFrame>,
{
    PipelineDriver::new(config).run(frames, recognizer, cancel, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RecognizerError;
    use crate::core::ocr::{Detection, ScriptedRecognizer};
    use crate::core::pipeline::events::{CallbackEvents, NoEvents};
    use image::RgbaImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn frames(count: usize) -> Vec<TimedFrame> {
        (0..count)
            .map(|i| TimedFrame::new(i as f64 * 0.5, RgbaImage::new(4, 4)))
            .collect()
    }

    fn script() -> Vec<Vec<(&'static str, f32)>> {
        vec![
            vec![("Hello there", 0.9)],
            vec![("Hello there", 0.9)],
            vec![("Goodbye now", 0.8), ("noise", 0.2)],
            vec![],
            vec![("Activate Windows", 0.99)],
            vec![("See you tomorrow", 0.7)],
            vec![("See you tomorrow", 0.7)],
            vec![("The end", 0.95)],
        ]
    }

    #[derive(Default)]
    struct Recorder {
        progress: Vec<u64>,
        lines: Vec<(f64, String)>,
        logs: Vec<LogEvent>,
    }

    impl PipelineEvents for Recorder {
        fn on_progress(&mut self, frames_processed: u64) {
            self.progress.push(frames_processed);
        }

        fn on_line(&mut self, timestamp: f64, text: &str) {
            self.lines.push((timestamp, text.to_string()));
        }

        fn on_log(&mut self, event: LogEvent) {
            self.logs.push(event);
        }
    }

    #[test]
    fn test_run_end_to_end() {
        let recognizer = ScriptedRecognizer::from_frames(script());
        let mut events = Recorder::default();
        let result = run(
            frames(8),
            &recognizer,
            &ExtractionConfig::default(),
            &CancelToken::new(),
            &mut events,
        );

        assert_eq!(
            result.lines,
            vec!["Hello there", "Goodbye now", "See you tomorrow", "The end"]
        );
        assert_eq!(
            result.cues,
            vec![
                Cue::new(0.0, 0.5, "Hello there"),
                Cue::new(1.0, 1.5, "Goodbye now"),
                Cue::new(2.5, 3.0, "See you tomorrow"),
                Cue::new(3.5, 4.0, "The end"),
            ]
        );
        assert_eq!(result.frames_processed, 8);
        assert!(!result.cancelled);
        assert_eq!(events.progress, (1..=8).collect::<Vec<u64>>());
        assert_eq!(events.lines[1], (1.0, "Goodbye now".to_string()));
        assert_eq!(recognizer.call_count(), 8);
    }

    #[test]
    fn test_single_line_run() {
        let recognizer = ScriptedRecognizer::from_frames(vec![vec![("Only line", 0.9)]]);
        let frames = vec![TimedFrame::new(10.0, RgbaImage::new(4, 4))];
        let result = run(
            frames,
            &recognizer,
            &ExtractionConfig::default(),
            &CancelToken::new(),
            &mut NoEvents,
        );
        assert_eq!(result.cues, vec![Cue::new(10.0, 10.5, "Only line")]);
    }

    #[test]
    fn test_empty_run_is_not_an_error() {
        let recognizer = ScriptedRecognizer::new(Vec::new());
        let result = run(
            frames(3),
            &recognizer,
            &ExtractionConfig::default(),
            &CancelToken::new(),
            &mut NoEvents,
        );
        assert!(result.cues.is_empty());
        assert!(result.lines.is_empty());
        assert_eq!(result.frames_processed, 3);
    }

    #[test]
    fn test_cancel_matches_truncated_run() {
        let config = ExtractionConfig::default();
        for stop_after in 0..=8usize {
            let cancel = CancelToken::new();
            let scripted = ScriptedRecognizer::from_frames(script());
            let calls = AtomicUsize::new(0);
            let trigger = cancel.clone();
            let recognizer = |image: &RgbaImage| -> Result<Vec<Detection>, RecognizerError> {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                let detections = scripted.recognize(image);
                if n >= stop_after {
                    trigger.cancel();
                }
                detections
            };
            if stop_after == 0 {
                cancel.cancel();
            }

            let mut progress = Vec::new();
            let mut events = CallbackEvents::new(|n| progress.push(n), |_, _| {});
            let cancelled = run(frames(8), &recognizer, &config, &cancel, &mut events);
            drop(events);

            let reference = run(
                frames(stop_after),
                &ScriptedRecognizer::from_frames(script()),
                &config,
                &CancelToken::new(),
                &mut NoEvents,
            );

            assert_eq!(cancelled.cues, reference.cues, "stop after {}", stop_after);
            assert_eq!(cancelled.lines, reference.lines);
            assert_eq!(cancelled.frames_processed, stop_after as u64);
            assert_eq!(calls.load(Ordering::SeqCst), stop_after);
            assert!(progress.iter().all(|&n| n <= stop_after as u64));
            assert!(cancelled.cancelled);
        }
    }

    #[test]
    fn test_recognizer_failure_recovered() {
        let recognizer = ScriptedRecognizer::new(vec![
            Ok(vec![Detection::new("Before the crash", 0.9)]),
            Err("engine restarted".to_string()),
            Ok(vec![Detection::new("After the crash", 0.9)]),
        ]);
        let mut events = Recorder::default();
        let result = run(
            frames(3),
            &recognizer,
            &ExtractionConfig::default(),
            &CancelToken::new(),
            &mut events,
        );

        assert_eq!(result.lines, vec!["Before the crash", "After the crash"]);
        assert_eq!(result.recognizer_failures, 1);
        assert_eq!(result.frames_processed, 3);
        assert!(events
            .logs
            .iter()
            .any(|e| e.message.contains("engine restarted")));
    }

    #[test]
    fn test_roi_applied_before_recognition() {
        let config = ExtractionConfig::subtitle_band();
        let recognizer = |image: &RgbaImage| -> Result<Vec<Detection>, RecognizerError> {
            Ok(vec![Detection::new(format!("{} by {}", image.width(), image.height()), 1.0)])
        };
        let frames = vec![TimedFrame::new(0.0, RgbaImage::new(640, 480))];
        let result = run(frames, &recognizer, &config, &CancelToken::new(), &mut NoEvents);
        assert_eq!(result.lines, vec!["640 by 144"]);
    }

    #[test]
    fn test_driver_reusable_across_runs() {
        let mut driver = PipelineDriver::new(&ExtractionConfig::default());
        let first = driver.run(
            frames(2),
            &ScriptedRecognizer::from_frames(script()),
            &CancelToken::new(),
            &mut NoEvents,
        );
        let second = driver.run(
            frames(2),
            &ScriptedRecognizer::from_frames(script()),
            &CancelToken::new(),
            &mut NoEvents,
        );
        // duplicate state from the first run must not leak into the second
        assert_eq!(first, second);
        assert_eq!(second.lines, vec!["Hello there"]);
    }
}
