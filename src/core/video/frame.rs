use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

/// A sampled frame. Owned by the driver for one iteration only.
#[derive(Debug, Clone)]
pub struct TimedFrame {
    /// Seconds from the start of the video
    pub timestamp: f64,
    pub image: RgbaImage,
}

impl TimedFrame {
    pub fn new(timestamp: f64, image: RgbaImage) -> Self {
        Self { timestamp, image }
    }

    /// The part of the frame the recognizer should see. Falls back to the
    /// whole frame when the ROI resolves to nothing.
    pub fn region(&self, roi: Option<&Roi>) -> RgbaImage {
        let rect = roi.and_then(|r| r.resolve(self.image.width(), self.image.height()));
        match rect {
            Some((x, y, w, h)) => imageops::crop_imm(&self.image, x, y, w, h).to_image(),
            None => self.image.clone(),
        }
    }
}

/// Region of interest handed to the recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Roi {
    Pixels { x: u32, y: u32, width: u32, height: u32 },
    /// Fractions of the frame size
    Relative { left: f32, top: f32, width: f32, height: f32 },
}

impl Roi {
    /// Full-width band covering the bottom `fraction` of the frame.
    pub fn bottom_band(fraction: f32) -> Self {
        let fraction = fraction.clamp(0.0, 1.0);
        Roi::Relative {
            left: 0.0,
            top: 1.0 - fraction,
            width: 1.0,
            height: fraction,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Roi::Pixels { width, height, .. } => {
                if width == 0 || height == 0 {
                    return Err("roi width and height must be non-zero".to_string());
                }
            }
            Roi::Relative { left, top, width, height } => {
                let in_unit = |v: f32| (0.0..=1.0).contains(&v);
                if !(in_unit(left) && in_unit(top) && in_unit(width) && in_unit(height)) {
                    return Err("relative roi values must be within [0, 1]".to_string());
                }
                if width <= 0.0 || height <= 0.0 {
                    return Err("relative roi width and height must be non-zero".to_string());
                }
                if left + width > 1.0 + f32::EPSILON || top + height > 1.0 + f32::EPSILON {
                    return Err("relative roi extends past the frame".to_string());
                }
            }
        }
        Ok(())
    }

    /// Pixel rectangle `(x, y, width, height)` clamped to the frame, or `None`
    /// when nothing of it is left.
    pub fn resolve(&self, frame_width: u32, frame_height: u32) -> Option<(u32, u32, u32, u32)> {
        let (x, y, w, h) = match *self {
            Roi::Pixels { x, y, width, height } => (x, y, width, height),
            Roi::Relative { left, top, width, height } => {
                let fw = frame_width as f32;
                let fh = frame_height as f32;
                (
                    (left * fw).round() as u32,
                    (top * fh).round() as u32,
                    (width * fw).round() as u32,
                    (height * fh).round() as u32,
                )
            }
        };

        if x >= frame_width || y >= frame_height {
            return None;
        }
        let w = w.min(frame_width - x);
        let h = h.min(frame_height - y);
        if w == 0 || h == 0 {
            return None;
        }
        Some((x, y, w, h))
    }
}
