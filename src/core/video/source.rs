use image::RgbaImage;
use log::warn;

use super::frame::TimedFrame;
use crate::core::error::SourceError;

/// Random-access frame reader: seek to a position and read one frame.
pub trait FrameDecoder: Send {
    /// `Ok(None)` once `position_ms` is past the end of the stream.
    fn frame_at(&mut self, position_ms: u64) -> Result<Option<RgbaImage>, SourceError>;

    fn duration_ms(&self) -> Option<u64> {
        None
    }
}

/// Lazily samples a decoder every `interval_ms`, starting at 0. Ends at the
/// end of the stream or at the first decode error.
pub struct IntervalSampler<D> {
    decoder: D,
    interval_ms: u64,
    position_ms: u64,
    finished: bool,
}

impl<D: FrameDecoder> IntervalSampler<D> {
    pub fn new(decoder: D, interval_ms: u64) -> Self {
        Self {
            decoder,
            interval_ms: interval_ms.max(1),
            position_ms: 0,
            finished: false,
        }
    }

    /// Number of frames the run will yield, when the duration is known.
    pub fn expected_frames(&self) -> Option<u64> {
        self.decoder
            .duration_ms()
            .map(|duration| duration.div_ceil(self.interval_ms))
    }
}

impl<D: FrameDecoder> Iterator for IntervalSampler<D> {
    type Item = TimedFrame;

    fn next(&mut self) -> Option<TimedFrame> {
        if self.finished {
            return None;
        }

        match self.decoder.frame_at(self.position_ms) {
            Ok(Some(image)) => {
                let frame = TimedFrame::new(self.position_ms as f64 / 1000.0, image);
                self.position_ms += self.interval_ms;
                Some(frame)
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                warn!("⚠️ Stopping at {} ms: {}", self.position_ms, e);
                self.finished = true;
                None
            }
        }
    }
}

/// Sample `decoder` every `interval_ms`.
pub fn sample<D: FrameDecoder>(decoder: D, interval_ms: u64) -> IntervalSampler<D> {
    IntervalSampler::new(decoder, interval_ms)
}
