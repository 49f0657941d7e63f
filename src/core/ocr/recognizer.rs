use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::core::error::RecognizerError;

/// One recognized text fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub text: String,
    /// 0.0 - 1.0
    pub confidence: f32,
}

impl Detection {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// An OCR engine. Detections come back in reading order; callers crop the
/// image to the region of interest beforehand.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &RgbaImage) -> Result<Vec<Detection>, RecognizerError>;

    fn name(&self) -> &str {
        "recognizer"
    }
}

impl<F> TextRecognizer for F
where
    F: Fn(&RgbaImage) -> Result<Vec<Detection>, RecognizerError> + Send + Sync,
{
    fn recognize(&self, image: &RgbaImage) -> Result<Vec<Detection>, RecognizerError> {
        self(image)
    }
}

type ScriptedResponse = Result<Vec<Detection>, String>;

/// Replays pre-recorded responses, one per call, then returns nothing.
pub struct ScriptedRecognizer {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    calls: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Each inner list holds `(text, confidence)` pairs for one frame.
    pub fn from_frames(frames: Vec<Vec<(&str, f32)>>) -> Self {
        Self::new(
            frames
                .into_iter()
                .map(|frame| {
                    Ok(frame
                        .into_iter()
                        .map(|(text, confidence)| Detection::new(text, confidence))
                        .collect())
                })
                .collect(),
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn recognize(&self, _image: &RgbaImage) -> Result<Vec<Detection>, RecognizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .map_err(|e| RecognizerError::Failed(format!("script lock poisoned: {}", e)))?
            .pop_front();
        match next {
            Some(Ok(detections)) => Ok(detections),
            Some(Err(message)) => Err(RecognizerError::Failed(message)),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
