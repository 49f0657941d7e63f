use log::debug;

use super::cue::AcceptedLine;
use super::deduplicator::DuplicateSuppressor;
use super::overlay::OverlayFilter;
use crate::core::config::ExtractionConfig;
use crate::core::ocr::Detection;

/// Why a detection did not make it into the frame's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    LowConfidence,
    Empty,
    Overlay,
    Duplicate,
}

/// Per-frame filter: confidence, blank text, overlays, then duplicates, in
/// that order. Carries the duplicate suppressor's state across frames.
#[derive(Debug, Clone)]
pub struct FrameNoiseGate {
    confidence_threshold: f32,
    overlay: OverlayFilter,
    dedup: DuplicateSuppressor,
}

impl FrameNoiseGate {
    pub fn new(confidence_threshold: f32, overlay: OverlayFilter, dedup: DuplicateSuppressor) -> Self {
        Self {
            confidence_threshold,
            overlay,
            dedup,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            config.confidence_threshold,
            OverlayFilter::new(&config.overlay_blacklist, config.overlay_threshold),
            DuplicateSuppressor::with_threshold(config.dedup_threshold),
        )
    }

    /// Classify one detection. Only an accepted detection updates the duplicate state.
    pub fn check(&mut self, detection: &Detection) -> Result<String, DropReason> {
        if detection.confidence.is_nan() || detection.confidence < self.confidence_threshold {
            return Err(DropReason::LowConfidence);
        }
        let text = detection.text.trim();
        if text.is_empty() {
            return Err(DropReason::Empty);
        }
        if self.overlay.is_overlay(text) {
            return Err(DropReason::Overlay);
        }
        if !self.dedup.accept(text) {
            return Err(DropReason::Duplicate);
        }
        Ok(text.to_string())
    }

    /// Surviving, trimmed texts in detection order.
    pub fn filter_detections(&mut self, detections: &[Detection]) -> Vec<String> {
        detections
            .iter()
            .filter_map(|detection| match self.check(detection) {
                Ok(text) => Some(text),
                Err(reason) => {
                    debug!("drop {:?} ({:.2}): {:?}", detection.text, detection.confidence, reason);
                    None
                }
            })
            .collect()
    }

    /// The frame's accepted line, or `None` when nothing survived.
    pub fn accept_frame(&mut self, timestamp: f64, detections: &[Detection]) -> Option<AcceptedLine> {
        let kept = self.filter_detections(detections);
        if kept.is_empty() {
            return None;
        }
        Some(AcceptedLine {
            timestamp,
            text: kept.join(" "),
        })
    }

    pub fn reset(&mut self) {
        self.dedup.reset();
    }
}

impl Default for FrameNoiseGate {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}
