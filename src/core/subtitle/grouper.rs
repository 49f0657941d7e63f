use std::mem;

use super::cue::Cue;
use super::fuzzy::{normalize, ratio};

#[derive(Debug, Clone)]
struct OpenCue {
    start: f64,
    last_seen: f64,
    text: String,
    key: String,
}

/// Merges consecutive similar lines into one cue spanning their timestamps.
///
/// A cue keeps the text of its first member; later near-duplicates only move
/// its end. When it is closed the end becomes the last member's timestamp plus
/// `pad`, so a cue seen once still lasts `pad` seconds.
#[derive(Debug, Clone)]
pub struct CueGrouper {
    threshold: f64,
    pad: f64,
    open: Option<OpenCue>,
    cues: Vec<Cue>,
}

impl CueGrouper {
    pub fn new(threshold: u8, pad: f64) -> Self {
        Self {
            threshold: f64::from(threshold),
            pad,
            open: None,
            cues: Vec::new(),
        }
    }

    /// Feed the next accepted line. Timestamps must not decrease.
    pub fn feed(&mut self, timestamp: f64, text: &str) {
        let key = normalize(text);

        if let Some(open) = self.open.as_mut() {
            if ratio(&key, &open.key) > self.threshold {
                open.last_seen = timestamp;
                return;
            }
        }

        self.close_open();
        self.open = Some(OpenCue {
            start: timestamp,
            last_seen: timestamp,
            text: text.to_string(),
            key,
        });
    }

    /// Close the open cue, if any, and hand back every cue collected so far.
    pub fn finish(&mut self) -> Vec<Cue> {
        self.close_open();
        mem::take(&mut self.cues)
    }

    /// Cues closed so far, not counting the open one.
    pub fn closed(&self) -> &[Cue] {
        &self.cues
    }

    pub fn reset(&mut self) {
        self.open = None;
        self.cues.clear();
    }

    fn close_open(&mut self) {
        if let Some(open) = self.open.take() {
            self.cues.push(Cue {
                start: open.start,
                end: open.last_seen + self.pad,
                text: open.text,
            });
        }
    }
}

impl Default for CueGrouper {
    fn default() -> Self {
        Self::new(90, 0.5)
    }
}
