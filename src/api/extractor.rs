//! 硬字幕提取器 - OCR + 去重 + 分组

use flutter_rust_bridge::frb;
use log::{info, warn};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::ApiError;
use crate::core::config::ExtractionConfig;
use crate::core::error::{ExtractError, SourceError};
use crate::core::ocr::{TesseractCli, TextRecognizer};
use crate::core::pipeline::{
    CancelToken, ExtractionHandle, ExtractionResult, ExtractionWorker, LogLevel, PipelineEvent,
};
use crate::core::subtitle::{srt, Cue};
use crate::core::video::{FfmpegDecoder, FrameDecoder, ImageSequenceDecoder};

/// `poll_events` 返回给宿主的事件
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorEvent {
    Started { expected_frames: Option<u64> },
    Progress { frames: u64 },
    Line { timestamp: f64, text: String },
    Log { level: String, message: String },
    Finished { cues: u32, lines: u32, cancelled: bool },
    Failed { message: String },
}

impl From<PipelineEvent> for ExtractorEvent {
    fn from(event: PipelineEvent) -> Self {
        match event {
            PipelineEvent::Started { expected_frames } => Self::Started { expected_frames },
            PipelineEvent::Progress(frames) => Self::Progress { frames },
            PipelineEvent::Line { timestamp, text } => Self::Line { timestamp, text },
            PipelineEvent::Log(log) => Self::Log {
                level: match log.level {
                    LogLevel::Info => "info",
                    LogLevel::Warn => "warn",
                    LogLevel::Error => "error",
                }
                .to_string(),
                message: log.message,
            },
            PipelineEvent::Finished(result) => Self::Finished {
                cues: result.cues.len() as u32,
                lines: result.lines.len() as u32,
                cancelled: result.cancelled,
            },
            PipelineEvent::Failed(message) => Self::Failed { message },
        }
    }
}

#[derive(Default)]
struct RunState {
    handle: Option<ExtractionHandle>,
    /// Outlives `handle` while `wait` joins outside the lock
    cancel: Option<CancelToken>,
    joining: bool,
    /// Bumped by every start and reset; a `wait` only stores into its own run
    run: u64,
    result: Option<ExtractionResult>,
    error: Option<ApiError>,
}

impl RunState {
    fn is_running(&self) -> bool {
        self.joining || self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn store(&mut self, outcome: Result<ExtractionResult, ExtractError>) {
        match outcome {
            Ok(result) => self.result = Some(result),
            Err(e) => {
                warn!("⚠️ Extraction failed: {}", e);
                self.error = Some(e.into());
            }
        }
    }

    /// Join the worker, if any, and keep what it produced.
    fn settle(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.store(handle.join());
        }
    }
}

/// 硬字幕提取器 - 同一时间只运行一个任务
///
/// 结果保留到下一次 `start_*` 或 `reset`。
///
/// ```dart
/// final extractor = SubtitleExtractor.create(configJson5: null);
/// await extractor.startVideo(path: videoPath);
/// final events = extractor.pollEvents();
/// await extractor.wait();
/// await extractor.saveSrt(path: srtPath);
/// ```
#[frb(opaque)]
pub struct SubtitleExtractor {
    config: ExtractionConfig,
    recognizer: Arc<dyn TextRecognizer>,
    state: Mutex<RunState>,
}

impl SubtitleExtractor {
    /// 创建字幕提取器（使用 tesseract 识别）
    ///
    /// config_json5 为空时使用默认配置
    #[frb(sync)]
    pub fn create(config_json5: Option<String>) -> Result<Self, ApiError> {
        crate::init_logging();
        let config = match config_json5 {
            Some(text) => ExtractionConfig::from_json5_str(&text)?,
            None => ExtractionConfig::default(),
        };
        let recognizer = Arc::new(TesseractCli::new(&config.recognizer));
        Ok(Self::with_recognizer(config, recognizer))
    }

    #[frb(ignore)]
    pub fn with_recognizer(config: ExtractionConfig, recognizer: Arc<dyn TextRecognizer>) -> Self {
        info!("🎬 SubtitleExtractor: created (recognizer: {})", recognizer.name());
        Self {
            config,
            recognizer,
            state: Mutex::new(RunState::default()),
        }
    }

    /// 开始提取视频字幕
    ///
    /// 已有任务运行时返回 `Busy`；视频无法打开时通过 `wait` 的结果报告
    #[frb(sync)]
    pub fn start_video(&self, path: String) -> Result<(), ApiError> {
        self.start_with(move || FfmpegDecoder::open(Path::new(&path)))
    }

    /// 开始提取图片序列字幕（目录内按文件名排序，按 fps 播放）
    #[frb(sync)]
    pub fn start_image_sequence(&self, dir: String, fps: f64) -> Result<(), ApiError> {
        self.start_with(move || ImageSequenceDecoder::open(Path::new(&dir), fps))
    }

    pub(crate) fn start_with<F, D>(&self, open_source: F) -> Result<(), ApiError>
    where
        F: FnOnce() -> Result<D, SourceError> + Send + 'static,
        D: FrameDecoder + 'static,
    {
        let mut state = self.lock_state()?;
        if state.is_running() {
            return Err(ApiError::busy());
        }
        // a finished but unjoined run is simply replaced
        *state = RunState {
            run: state.run + 1,
            ..RunState::default()
        };

        let handle =
            ExtractionWorker::spawn(open_source, Arc::clone(&self.recognizer), self.config.clone())?;
        state.cancel = Some(handle.cancel_token());
        state.handle = Some(handle);
        Ok(())
    }

    /// 取消当前任务（处理完当前帧后停止）
    #[frb(sync)]
    pub fn cancel(&self) {
        if let Ok(state) = self.state.lock() {
            if let Some(cancel) = &state.cancel {
                info!("⏹️ SubtitleExtractor: cancel requested");
                cancel.cancel();
            }
        }
    }

    #[frb(sync)]
    pub fn is_running(&self) -> bool {
        self.state.lock().map(|s| s.is_running()).unwrap_or(false)
    }

    /// 获取上次轮询后的事件（按顺序）
    ///
    /// 收到结束事件后自动回收工作线程并保存结果
    #[frb(sync)]
    pub fn poll_events(&self) -> Vec<ExtractorEvent> {
        let Ok(mut state) = self.state.lock() else {
            return Vec::new();
        };
        let Some(handle) = &state.handle else {
            return Vec::new();
        };

        let events: Vec<ExtractorEvent> = handle.try_events().map(ExtractorEvent::from).collect();
        let done = events.iter().any(|e| {
            matches!(e, ExtractorEvent::Finished { .. } | ExtractorEvent::Failed { .. })
        });
        if done {
            state.settle();
        }
        events
    }

    /// 阻塞等待当前任务结束并返回结果（未轮询的事件会被丢弃）
    pub fn wait(&self) -> Result<ExtractionResult, ApiError> {
        let (handle, run) = {
            let mut state = self.lock_state()?;
            let handle = state.handle.take();
            state.joining = handle.is_some();
            (handle, state.run)
        };
        if let Some(handle) = handle {
            // joined outside the lock so cancel() stays usable
            let outcome = handle.join();
            let mut state = self.lock_state()?;
            state.joining = false;
            if state.run == run {
                state.store(outcome);
            } else {
                info!("🧹 SubtitleExtractor: dropped the result of a reset run");
            }
        }

        let state = self.lock_state()?;
        match (&state.result, &state.error) {
            (Some(result), _) => Ok(result.clone()),
            (None, Some(error)) => Err(error.clone()),
            (None, None) => Err(ApiError::idle()),
        }
    }

    /// 获取字幕条目
    #[frb(sync, getter)]
    pub fn cues(&self) -> Vec<Cue> {
        self.with_result(|r| r.cues.clone())
    }

    /// 获取识别出的文本行（按顺序）
    #[frb(sync, getter)]
    pub fn lines(&self) -> Vec<String> {
        self.with_result(|r| r.lines.clone())
    }

    #[frb(sync)]
    pub fn to_srt(&self) -> String {
        self.with_result(|r| srt::to_srt(&r.cues))
    }

    /// 保存为 SRT 文件
    ///
    /// 写入失败不会丢弃字幕，可换路径重试
    pub fn save_srt(&self, path: String) -> Result<(), ApiError> {
        let cues = self.cues();
        srt::write_srt(&cues, Path::new(&path))?;
        info!("💾 Saved {} cues to {}", cues.len(), path);
        Ok(())
    }

    /// 保存为纯文本（每行一条）
    pub fn save_text(&self, path: String) -> Result<(), ApiError> {
        let lines = self.lines();
        srt::write_plain_text(&lines, Path::new(&path))?;
        info!("💾 Saved {} lines to {}", lines.len(), path);
        Ok(())
    }

    /// 重置状态
    ///
    /// 运行中的任务会被取消；若另一线程正在 `wait`，返回前仍视为运行中
    #[frb(sync)]
    pub fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(cancel) = &state.cancel {
                cancel.cancel();
            }
            *state = RunState {
                joining: state.joining,
                run: state.run + 1,
                ..RunState::default()
            };
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, RunState>, ApiError> {
        self.state
            .lock()
            .map_err(|e| ApiError::internal(format!("state lock poisoned: {}", e)))
    }

    fn with_result<T: Default>(&self, f: impl FnOnce(&ExtractionResult) -> T) -> T {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.result.as_ref().map(f))
            .unwrap_or_default()
    }
}

impl Drop for SubtitleExtractor {
    fn drop(&mut self) {
        self.reset();
        info!("🗑️ SubtitleExtractor: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RecognizerError;
    use crate::core::ocr::{Detection, ScriptedRecognizer};
    use crate::core::video::source::tests::FakeDecoder;
    use image::RgbaImage;
    use std::fs;
    use std::sync::mpsc::sync_channel;

    fn extractor(frames: Vec<Vec<(&str, f32)>>) -> SubtitleExtractor {
        SubtitleExtractor::with_recognizer(
            ExtractionConfig::default(),
            Arc::new(ScriptedRecognizer::from_frames(frames)),
        )
    }

    #[test]
    fn test_create_with_config() {
        let extractor = SubtitleExtractor::create(Some("{ intervalMs: 1000 }".to_string())).unwrap();
        assert_eq!(extractor.config.interval_ms, 1000);
        assert!(!extractor.is_running());

        let err = SubtitleExtractor::create(Some("{ intervalMs: 0 }".to_string()))
            .err()
            .unwrap();
        assert_eq!(err.error_type, "Config");
    }

    #[test]
    fn test_run_and_save() {
        let extractor = extractor(vec![
            vec![("Hello there", 0.9)],
            vec![("Hello there", 0.9)],
            vec![("Goodbye now", 0.9)],
        ]);
        extractor.start_with(|| Ok(FakeDecoder::new(1500))).unwrap();
        let result = extractor.wait().unwrap();
        assert_eq!(result.frames_processed, 3);
        assert_eq!(extractor.lines(), vec!["Hello there", "Goodbye now"]);
        assert_eq!(
            extractor.to_srt(),
            "1\n00:00:00,000 --> 00:00:00,500\nHello there\n\n\
             2\n00:00:01,000 --> 00:00:01,500\nGoodbye now\n\n"
        );

        let dir = tempfile::tempdir().unwrap();
        let srt_path = dir.path().join("out.srt");
        let txt_path = dir.path().join("out.txt");
        extractor.save_srt(srt_path.to_string_lossy().to_string()).unwrap();
        extractor.save_text(txt_path.to_string_lossy().to_string()).unwrap();
        assert_eq!(fs::read_to_string(&srt_path).unwrap(), extractor.to_srt());
        assert_eq!(fs::read_to_string(&txt_path).unwrap(), "Hello there\nGoodbye now\n");
    }

    #[test]
    fn test_failed_save_keeps_cues() {
        let extractor = extractor(vec![vec![("Hello there", 0.9)]]);
        extractor.start_with(|| Ok(FakeDecoder::new(500))).unwrap();
        extractor.wait().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("missing").join("out.srt");
        let err = extractor.save_srt(bad.to_string_lossy().to_string()).unwrap_err();
        assert_eq!(err.error_type, "Save");
        assert_eq!(extractor.cues(), vec![Cue::new(0.0, 0.5, "Hello there")]);

        let good = dir.path().join("out.srt");
        assert!(extractor.save_srt(good.to_string_lossy().to_string()).is_ok());
    }

    #[test]
    fn test_second_start_is_busy() {
        let (release_tx, release_rx) = sync_channel::<()>(0);
        let release_rx = Mutex::new(release_rx);
        let recognizer = move |_: &RgbaImage| -> Result<Vec<Detection>, RecognizerError> {
            let _ = release_rx.lock().map(|rx| rx.recv());
            Ok(Vec::new())
        };
        let extractor =
            SubtitleExtractor::with_recognizer(ExtractionConfig::default(), Arc::new(recognizer));

        extractor.start_with(|| Ok(FakeDecoder::new(60_000))).unwrap();
        let err = extractor.start_with(|| Ok(FakeDecoder::new(500))).unwrap_err();
        assert_eq!(err.error_type, "Busy");
        assert!(extractor.is_running());

        extractor.cancel();
        drop(release_tx);
        let result = extractor.wait().unwrap();
        assert!(result.cancelled);
        assert!(!extractor.is_running());
    }

    #[test]
    fn test_missing_video_reported_by_wait() {
        let extractor = extractor(Vec::new());
        extractor
            .start_video("/definitely/not/here.mp4".to_string())
            .unwrap();
        let err = extractor.wait().unwrap_err();
        assert_eq!(err.error_type, "SourceUnavailable");
        assert!(extractor.cues().is_empty());
    }

    #[test]
    fn test_image_sequence_run_with_polling() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..4 {
            RgbaImage::new(8, 8)
                .save(dir.path().join(format!("{:03}.png", i)))
                .unwrap();
        }
        let extractor = extractor(vec![
            vec![("First caption", 0.9)],
            vec![],
            vec![("Second caption here", 0.9)],
        ]);
        extractor
            .start_image_sequence(dir.path().to_string_lossy().to_string(), 2.0)
            .unwrap();

        let mut events = Vec::new();
        while !events.iter().any(|e| {
            matches!(e, ExtractorEvent::Finished { .. } | ExtractorEvent::Failed { .. })
        }) {
            events.extend(extractor.poll_events());
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        assert_eq!(events.first(), Some(&ExtractorEvent::Started { expected_frames: Some(4) }));
        assert!(matches!(events.last(), Some(ExtractorEvent::Finished { cues: 2, .. })));
        assert!(events.contains(&ExtractorEvent::Progress { frames: 4 }));
        assert!(events.contains(&ExtractorEvent::Line {
            timestamp: 1.0,
            text: "Second caption here".to_string()
        }));
        assert_eq!(extractor.cues().len(), 2);
        assert_eq!(extractor.wait().unwrap().frames_processed, 4);
    }

    #[test]
    fn test_reset_during_wait_discards_old_run() {
        let (entered_tx, entered_rx) = sync_channel::<()>(0);
        let (release_tx, release_rx) = sync_channel::<()>(0);
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);
        let recognizer = move |_: &RgbaImage| -> Result<Vec<Detection>, RecognizerError> {
            let _ = entered_tx.lock().map(|tx| tx.send(()));
            let _ = release_rx.lock().map(|rx| rx.recv());
            Ok(vec![Detection::new("Old run caption", 0.9)])
        };
        let extractor = Arc::new(SubtitleExtractor::with_recognizer(
            ExtractionConfig::default(),
            Arc::new(recognizer),
        ));

        extractor.start_with(|| Ok(FakeDecoder::new(60_000))).unwrap();
        entered_rx.recv().unwrap();

        let waiter = {
            let extractor = Arc::clone(&extractor);
            std::thread::spawn(move || extractor.wait())
        };
        while !extractor.state.lock().unwrap().joining {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        extractor.reset();
        // the old worker is still inside the recognizer
        let err = extractor.start_with(|| Ok(FakeDecoder::new(500))).unwrap_err();
        assert_eq!(err.error_type, "Busy");

        drop(entered_rx);
        release_tx.send(()).unwrap();
        assert_eq!(waiter.join().unwrap().unwrap_err().error_type, "Idle");
        assert!(!extractor.is_running());
        assert!(extractor.cues().is_empty());

        drop(release_tx);
        extractor.start_with(|| Ok(FakeDecoder::new(500))).unwrap();
        let result = extractor.wait().unwrap();
        assert_eq!(result.frames_processed, 1);
        assert_eq!(extractor.lines(), vec!["Old run caption"]);
    }

    #[test]
    fn test_wait_before_start_is_idle() {
        let extractor = extractor(Vec::new());
        assert_eq!(extractor.wait().unwrap_err().error_type, "Idle");
        extractor.reset();
        assert!(extractor.lines().is_empty());
    }
}
