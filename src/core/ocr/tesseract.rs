//! Recognizer backed by the `tesseract` command-line tool.

use image::{ImageOutputFormat, RgbaImage};
use log::debug;
use std::io::{Cursor, ErrorKind, Write};
use std::process::{Command, Stdio};

use super::recognizer::{Detection, TextRecognizer};
use crate::core::config::RecognizerConfig;
use crate::core::error::RecognizerError;

const TSV_WORD_LEVEL: u32 = 5;
const TSV_MIN_FIELDS: usize = 12;

pub struct TesseractCli {
    binary: String,
    language: String,
    page_seg_mode: u8,
}

impl TesseractCli {
    pub fn new(config: &RecognizerConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            language: config.language.clone(),
            page_seg_mode: config.page_seg_mode,
        }
    }

    fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RecognizerError> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .map_err(|e| RecognizerError::Image(e.to_string()))?;
        Ok(buffer.into_inner())
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new(&RecognizerConfig::default())
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, image: &RgbaImage) -> Result<Vec<Detection>, RecognizerError> {
        let png = Self::encode_png(image)?;

        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_seg_mode.to_string())
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(RecognizerError::Spawn)?;

        // Always reap the child, even if it quit before reading the frame.
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png),
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| RecognizerError::Failed(format!("waiting for {}: {}", self.binary, e)))?;
        if !output.status.success() {
            return Err(RecognizerError::Failed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if let Err(e) = sent {
            if e.kind() != ErrorKind::BrokenPipe {
                return Err(RecognizerError::Failed(format!(
                    "could not send the frame to {}: {}",
                    self.binary, e
                )));
            }
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let detections = parse_tsv_lines(&tsv);
        debug!("tesseract: {} line(s)", detections.len());
        Ok(detections)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Group Tesseract TSV word rows into one detection per text line.
///
/// Words keep their order; the line confidence is the mean word confidence
/// scaled to 0-1. Rows without text or with a negative confidence are skipped.
pub fn parse_tsv_lines(tsv: &str) -> Vec<Detection> {
    let mut lines: Vec<((&str, &str, &str, &str), Vec<&str>, Vec<f32>)> = Vec::new();

    for (line_num, row) in tsv.lines().enumerate() {
        if line_num == 0 {
            continue;
        }

        let fields: Vec<&str> = row.trim_end_matches('\r').split('\t').collect();
        if fields.len() < TSV_MIN_FIELDS {
            continue;
        }
        if fields[0].parse::<u32>().unwrap_or(0) != TSV_WORD_LEVEL {
            continue;
        }

        let conf = fields[10].trim().parse::<f32>().unwrap_or(-1.0);
        let text = fields[11].trim();
        if conf < 0.0 || text.is_empty() {
            continue;
        }

        let key = (fields[1], fields[2], fields[3], fields[4]);
        match lines.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, words, confs)) => {
                words.push(text);
                confs.push(conf);
            }
            None => lines.push((key, vec![text], vec![conf])),
        }
    }

    lines
        .into_iter()
        .map(|(_, words, confs)| {
            let mean = confs.iter().sum::<f32>() / confs.len() as f32;
            Detection::new(words.join(" "), (mean / 100.0).clamp(0.0, 1.0))
        })
        .collect()
}
