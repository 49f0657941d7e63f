use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Video not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Probe failed: {0}")]
    Probe(String),
    #[error("Frame decode failed: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("Failed to launch recognizer: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Recognizer failed: {0}")]
    Failed(String),
    #[error("Image encode error: {0}")]
    Image(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Frame source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to spawn extraction worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Extraction worker panicked")]
    WorkerPanicked,
}

/// Writing an output file failed. The cues it was asked to write are untouched.
#[derive(Debug, Error)]
#[error("Cannot write {}: {source}", path.display())]
pub struct SaveError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error, PartialEq)]
pub enum SrtParseError {
    #[error("line {line}: expected cue index, found {found:?}")]
    BadIndex { line: usize, found: String },
    #[error("line {line}: malformed timing line {found:?}")]
    BadTiming { line: usize, found: String },
    #[error("line {line}: cue ends before it starts")]
    Inverted { line: usize },
}
