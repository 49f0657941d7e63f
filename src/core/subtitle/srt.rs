//! SRT cue files and plain-text exports.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

use super::cue::Cue;
use crate::core::error::{SaveError, SrtParseError};

static TIMING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("valid timing regex")
});

/// Format seconds as `HH:MM:SS,mmm`, rounded to the millisecond. Hours do not wrap.
pub fn format_time(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let h = total_ms / 3_600_000;
    let m = (total_ms % 3_600_000) / 60_000;
    let s = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// Render cues as an SRT document, indices starting at 1.
pub fn to_srt(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (index, cue) in cues.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_time(cue.start),
            format_time(cue.end),
            cue.text
        ));
    }
    out
}

pub fn write_srt(cues: &[Cue], path: &Path) -> Result<(), SaveError> {
    write_file(path, &to_srt(cues))
}

/// One line per entry, each newline-terminated.
pub fn to_plain_text(lines: &[String]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

pub fn write_plain_text(lines: &[String], path: &Path) -> Result<(), SaveError> {
    write_file(path, &to_plain_text(lines))
}

fn write_file(path: &Path, contents: &str) -> Result<(), SaveError> {
    fs::write(path, contents).map_err(|source| SaveError {
        path: path.to_path_buf(),
        source,
    })
}

/// Read an SRT document back into cues. Tolerates a BOM, CRLF line endings
/// and multi-line text (joined with `\n`); indices are not checked for order.
pub fn parse_srt(data: &str) -> Result<Vec<Cue>, SrtParseError> {
    let data = data.trim_start_matches('\u{FEFF}');
    let mut cues = Vec::new();
    let mut lines = data.lines().map(|l| l.trim_end_matches('\r')).enumerate().peekable();

    loop {
        // skip blank separators
        while let Some((_, line)) = lines.peek() {
            if line.trim().is_empty() {
                lines.next();
            } else {
                break;
            }
        }

        let Some((index_no, index_line)) = lines.next() else {
            break;
        };
        if index_line.trim().parse::<u64>().is_err() {
            return Err(SrtParseError::BadIndex {
                line: index_no + 1,
                found: index_line.to_string(),
            });
        }

        let (timing_no, timing_line) = lines.next().unwrap_or((index_no + 1, ""));
        let caps = TIMING_LINE
            .captures(timing_line.trim())
            .ok_or_else(|| SrtParseError::BadTiming {
                line: timing_no + 1,
                found: timing_line.to_string(),
            })?;
        let field = |i: usize| caps[i].parse::<u64>().unwrap_or(0);
        let start = seconds_from_parts(field(1), field(2), field(3), field(4));
        let end = seconds_from_parts(field(5), field(6), field(7), field(8));
        if end < start {
            return Err(SrtParseError::Inverted { line: timing_no + 1 });
        }

        let mut text_lines = Vec::new();
        while let Some((_, line)) = lines.peek() {
            if line.trim().is_empty() {
                break;
            }
            text_lines.push(line.to_string());
            lines.next();
        }

        cues.push(Cue {
            start,
            end,
            text: text_lines.join("\n"),
        });
    }

    Ok(cues)
}

fn seconds_from_parts(h: u64, m: u64, s: u64, ms: u64) -> f64 {
    (h * 3_600_000 + m * 60_000 + s * 1000 + ms) as f64 / 1000.0
}
