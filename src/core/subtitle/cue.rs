use serde::{Deserialize, Serialize};

/// The text that survived the noise gate for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedLine {
    /// Seconds from the start of the video
    pub timestamp: f64,
    pub text: String,
}

/// A finished subtitle entry. `start <= end` and `text` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Cue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
