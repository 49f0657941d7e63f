pub mod recognizer;
pub mod tesseract;

pub use recognizer::{Detection, ScriptedRecognizer, TextRecognizer};
pub use tesseract::{parse_tsv_lines, TesseractCli};
