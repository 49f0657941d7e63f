use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};

use super::source::FrameDecoder;
use crate::core::error::SourceError;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Still images in a directory, played back in file-name order at `fps`.
pub struct ImageSequenceDecoder {
    files: Vec<PathBuf>,
    fps: f64,
}

impl ImageSequenceDecoder {
    pub fn open(dir: &Path, fps: f64) -> Result<Self, SourceError> {
        if !dir.is_dir() {
            return Err(SourceError::NotFound(dir.to_path_buf()));
        }
        if !fps.is_finite() || fps <= 0.0 {
            return Err(SourceError::Probe(format!("invalid frame rate {}", fps)));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(SourceError::Probe(format!("no images in {}", dir.display())));
        }
        Ok(Self { files, fps })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameDecoder for ImageSequenceDecoder {
    fn frame_at(&mut self, position_ms: u64) -> Result<Option<RgbaImage>, SourceError> {
        let index = (position_ms as f64 * self.fps / 1000.0).floor() as usize;
        let Some(path) = self.files.get(index) else {
            return Ok(None);
        };
        let image = image::open(path)
            .map_err(|e| SourceError::Decode(format!("{}: {}", path.display(), e)))?;
        Ok(Some(image.to_rgba8()))
    }

    fn duration_ms(&self) -> Option<u64> {
        Some((self.files.len() as f64 * 1000.0 / self.fps).round() as u64)
    }
}
