//! Frame decoding through the `ffmpeg` / `ffprobe` command-line tools.

use image::RgbaImage;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::source::FrameDecoder;
use crate::core::error::SourceError;

pub struct FfmpegDecoder {
    path: PathBuf,
    duration_ms: Option<u64>,
}

impl FfmpegDecoder {
    /// Open `path`, probing its duration. Fails if the file is missing or
    /// ffprobe cannot read it.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if !path.is_file() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }

        let duration_ms = probe_duration_ms(path)?;
        info!("🎬 Opened {:?} (duration: {:?} ms)", path, duration_ms);
        Ok(Self {
            path: path.to_path_buf(),
            duration_ms,
        })
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn frame_at(&mut self, position_ms: u64) -> Result<Option<RgbaImage>, SourceError> {
        if matches!(self.duration_ms, Some(duration) if position_ms >= duration) {
            return Ok(None);
        }

        let seek = format!("{:.3}", position_ms as f64 / 1000.0);
        let output = Command::new("ffmpeg")
            .arg("-v")
            .arg("error")
            .arg("-ss")
            .arg(&seek)
            .arg("-i")
            .arg(&self.path)
            .arg("-frames:v")
            .arg("1")
            .arg("-f")
            .arg("image2pipe")
            .arg("-vcodec")
            .arg("png")
            .arg("-")
            .output()?;

        if !output.status.success() {
            return Err(SourceError::Decode(format!(
                "ffmpeg failed at {}s: {}",
                seek,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if output.stdout.is_empty() {
            debug!("no frame at {} ms, end of stream", position_ms);
            return Ok(None);
        }

        let image = image::load_from_memory(&output.stdout)
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(Some(image.to_rgba8()))
    }

    fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }
}

fn probe_duration_ms(path: &Path) -> Result<Option<u64>, SourceError> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(path)
        .output()
        .map_err(|e| SourceError::Probe(format!("cannot run ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(SourceError::Probe(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(parse_duration_ms(&String::from_utf8_lossy(&output.stdout)))
}

/// ffprobe prints seconds, or `N/A` for streams without a known length.
fn parse_duration_ms(text: &str) -> Option<u64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| (secs * 1000.0).round() as u64)
}
