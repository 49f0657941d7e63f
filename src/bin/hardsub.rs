//! Extract burned-in subtitles from a video into an SRT file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hardsub_lib::core::config::ExtractionConfig;
use hardsub_lib::core::ocr::TesseractCli;
use hardsub_lib::core::pipeline::{ExtractionWorker, LogLevel, PipelineEvent};
use hardsub_lib::core::subtitle::srt;
use hardsub_lib::core::video::{FfmpegDecoder, ImageSequenceDecoder, Roi};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};

#[derive(Debug, Parser)]
/// OCR the hard-coded subtitles of a video and write them as SRT. Needs
/// `ffmpeg`, `ffprobe` and `tesseract` on the PATH.
#[command(name = "hardsub", version)]
struct Args {
    /// Video file, or a directory of frames when --fps is given.
    input: PathBuf,

    /// Where to write the subtitles. Defaults to the input path with `.srt`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the recognized lines, one per line, without timing.
    #[arg(long)]
    text: Option<PathBuf>,

    /// Also write the whole run (cues, lines, counters) as JSON.
    #[arg(long)]
    json: Option<PathBuf>,

    /// JSON5 config file; command-line options override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling period in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Tesseract language, e.g. `eng` or `eng+fra`.
    #[arg(long)]
    lang: Option<String>,

    /// Only read the bottom part of the frame, as a fraction of its height.
    #[arg(long, value_name = "FRACTION")]
    bottom: Option<f32>,

    /// Treat the input as a directory of still frames at this frame rate.
    #[arg(long)]
    fps: Option<f64>,
}

fn main() -> Result<()> {
    hardsub_lib::init_logging();
    let args = Args::parse();

    let config = load_config(&args)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("srt"));

    let recognizer = Arc::new(TesseractCli::new(&config.recognizer));
    let input = args.input.clone();
    let handle = match args.fps {
        Some(fps) => ExtractionWorker::spawn(
            move || ImageSequenceDecoder::open(&input, fps),
            recognizer,
            config,
        )?,
        None => ExtractionWorker::spawn(move || FfmpegDecoder::open(&input), recognizer, config)?,
    };

    // First Ctrl-C stops at the next frame and keeps what was found; a second one quits.
    let cancel = handle.cancel_token();
    ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            process::exit(130);
        }
        warn!("⏹️ Cancelling, partial subtitles will still be saved");
        cancel.cancel();
    })
    .context("Could not install the Ctrl-C handler")?;

    let bar_style = ProgressStyle::default_bar()
        .template("{prefix} {pos:>4}/{len:4} {wide_bar:.cyan/blue} {eta_precise}")?;
    let spinner_style = ProgressStyle::default_spinner().template("{spinner} {prefix} {pos} frames")?;
    let pb = ProgressBar::new_spinner().with_style(spinner_style);
    pb.set_prefix("OCR");

    for event in handle.events() {
        match event {
            PipelineEvent::Started { expected_frames } => match expected_frames {
                Some(total) => {
                    pb.set_style(bar_style.clone());
                    pb.set_length(total);
                }
                None => pb.enable_steady_tick(Duration::from_millis(120)),
            },
            PipelineEvent::Progress(frames) => pb.set_position(frames),
            PipelineEvent::Line { timestamp, text } => {
                pb.suspend(|| println!("[{:.1}s] {}", timestamp, text))
            }
            PipelineEvent::Log(log) => pb.suspend(|| match log.level {
                LogLevel::Info => info!("{}", log.message),
                LogLevel::Warn => warn!("{}", log.message),
                LogLevel::Error => error!("{}", log.message),
            }),
            PipelineEvent::Finished(_) => pb.finish_and_clear(),
            PipelineEvent::Failed(_) => pb.abandon(),
        }
    }

    let result = handle
        .join()
        .with_context(|| format!("Could not extract subtitles from {}", args.input.display()))?;
    if result.cancelled {
        warn!("⏹️ Cancelled after {} frames", result.frames_processed);
    }

    srt::write_srt(&result.cues, &output)?;
    info!("💾 Wrote {} cues to {}", result.cues.len(), output.display());

    if let Some(text) = &args.text {
        srt::write_plain_text(&result.lines, text)?;
        info!("💾 Wrote {} lines to {}", result.lines.len(), text.display());
    }
    if let Some(json) = &args.json {
        let data = serde_json::to_string_pretty(&result)?;
        fs::write(json, data).with_context(|| format!("Could not write {}", json.display()))?;
    }
    if result.recognizer_failures > 0 {
        warn!("⚠️ {} frames could not be recognized", result.recognizer_failures);
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<ExtractionConfig> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => ExtractionConfig::default(),
    };
    if let Some(interval_ms) = args.interval_ms {
        config.interval_ms = interval_ms;
    }
    if let Some(lang) = &args.lang {
        config.recognizer.language = lang.clone();
    }
    if let Some(fraction) = args.bottom {
        config.roi = Some(Roi::bottom_band(fraction));
    }
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<ExtractionConfig> {
    ExtractionConfig::from_path(path)
        .with_context(|| format!("Could not load config {}", path.display()))
}
