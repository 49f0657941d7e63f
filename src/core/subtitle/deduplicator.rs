use super::fuzzy::{normalize, ratio};

/// Remembers the most recently accepted fragment and rejects near-identical
/// repeats of it. Only one fragment is remembered, so a line that comes back
/// after a different one is accepted again.
#[derive(Debug, Clone)]
pub struct DuplicateSuppressor {
    /// Normalized form of the last accepted fragment
    last_accepted: Option<String>,
    threshold: f64,
}

#[derive(Debug, Clone)]
pub struct DedupDecision {
    pub is_duplicate: bool,
    pub reason: DedupReason,
    /// 0-100 score against the last accepted fragment; 0 when there was none
    pub similarity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DedupReason {
    FirstFragment,
    TextChanged,
    TooSimilar,
}

impl DuplicateSuppressor {
    pub fn new() -> Self {
        Self::with_threshold(90)
    }

    pub fn with_threshold(threshold: u8) -> Self {
        Self {
            last_accepted: None,
            threshold: f64::from(threshold),
        }
    }

    /// Decide on `text` and remember it when it is not a duplicate.
    pub fn check(&mut self, text: &str) -> DedupDecision {
        let key = normalize(text);

        let decision = match &self.last_accepted {
            None => DedupDecision {
                is_duplicate: false,
                reason: DedupReason::FirstFragment,
                similarity: 0.0,
            },
            Some(last) => {
                let similarity = ratio(&key, last);
                if similarity > self.threshold {
                    return DedupDecision {
                        is_duplicate: true,
                        reason: DedupReason::TooSimilar,
                        similarity,
                    };
                }
                DedupDecision {
                    is_duplicate: false,
                    reason: DedupReason::TextChanged,
                    similarity,
                }
            }
        };

        self.last_accepted = Some(key);
        decision
    }

    pub fn accept(&mut self, text: &str) -> bool {
        !self.check(text).is_duplicate
    }

    pub fn last_accepted(&self) -> Option<&str> {
        self.last_accepted.as_deref()
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}

impl Default for DuplicateSuppressor {
    fn default() -> Self {
        Self::new()
    }
}
