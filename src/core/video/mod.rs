pub mod ffmpeg;
pub mod frame;
pub mod sequence;
pub mod source;

pub use ffmpeg::FfmpegDecoder;
pub use frame::{Roi, TimedFrame};
pub use sequence::ImageSequenceDecoder;
pub use source::{sample, FrameDecoder, IntervalSampler};
