use super::fuzzy::{normalize, partial_ratio};

/// System overlay strings that OCR keeps picking up on screen recordings.
pub const DEFAULT_OVERLAY_BLACKLIST: &[&str] = &[
    "activate windows",
    "press ctrl+alt+del",
    "go to settings to activate windows",
    "windows",
    "go to",
];

/// Rejects text that partially matches any blacklisted overlay phrase.
#[derive(Debug, Clone)]
pub struct OverlayFilter {
    /// Pre-normalized phrases, blanks removed
    phrases: Vec<String>,
    threshold: f64,
}

impl OverlayFilter {
    pub fn new<S: AsRef<str>>(blacklist: &[S], threshold: u8) -> Self {
        Self {
            phrases: blacklist
                .iter()
                .map(|p| normalize(p.as_ref()))
                .filter(|p| !p.is_empty())
                .collect(),
            threshold: f64::from(threshold),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_OVERLAY_BLACKLIST, 80)
    }

    pub fn is_overlay(&self, text: &str) -> bool {
        self.matching_phrase(text).is_some()
    }

    /// The first blacklisted phrase whose partial score exceeds the threshold.
    pub fn matching_phrase(&self, text: &str) -> Option<&str> {
        let text = normalize(text);
        if text.is_empty() {
            return None;
        }
        self.phrases
            .iter()
            .find(|phrase| partial_ratio(&text, phrase) > self.threshold)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

impl Default for OverlayFilter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// One-shot form of [`OverlayFilter::is_overlay`].
pub fn is_overlay<S: AsRef<str>>(text: &str, blacklist: &[S], threshold: u8) -> bool {
    OverlayFilter::new(blacklist, threshold).is_overlay(text)
}
