pub mod error;
pub mod extractor;

pub use error::ApiError;
pub use extractor::{ExtractorEvent, SubtitleExtractor};
