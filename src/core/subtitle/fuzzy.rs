//! 0-100 fuzzy similarity scores over normalized text.

/// Comparison key for a recognized string: trimmed, inner whitespace collapsed,
/// lower-cased. Stored text is never replaced by this.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whole-string similarity based on normalized Levenshtein distance.
pub fn ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Best `ratio` of the shorter string against any equally long window of the
/// longer one, so short phrases embedded in longer text still score high.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let (needle, haystack) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if needle.is_empty() {
        return 0.0;
    }
    if needle.len() == haystack.len() {
        return ratio(a, b);
    }

    let needle: String = needle.into_iter().collect();
    let mut best = 0.0f64;
    for window in haystack.windows(needle.chars().count()) {
        let candidate: String = window.iter().collect();
        let score = ratio(&needle, &candidate);
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }
    best
}
