//! Text side of the pipeline: per-frame noise filtering, duplicate suppression,
//! grouping into timed cues and the SRT / plain-text formats.

pub mod cue;
pub mod deduplicator;
pub mod fuzzy;
pub mod grouper;
pub mod noise_gate;
pub mod overlay;
pub mod srt;

pub use cue::{AcceptedLine, Cue};
pub use deduplicator::{DedupDecision, DedupReason, DuplicateSuppressor};
pub use fuzzy::{normalize, partial_ratio, ratio};
pub use grouper::CueGrouper;
pub use noise_gate::{DropReason, FrameNoiseGate};
pub use overlay::{is_overlay, OverlayFilter, DEFAULT_OVERLAY_BLACKLIST};
