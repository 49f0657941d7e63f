pub mod config;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod subtitle;
pub mod video;

pub use config::ExtractionConfig;
pub use error::{ConfigError, ExtractError, RecognizerError, SaveError, SourceError, SrtParseError};
