use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::ConfigError;
use crate::core::subtitle::DEFAULT_OVERLAY_BLACKLIST;
use crate::core::video::Roi;

/// Settings for the bundled `tesseract` recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecognizerConfig {
    pub binary: String,
    pub language: String,
    /// Tesseract `--psm`; 6 treats the crop as one uniform block of text
    pub page_seg_mode: u8,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: "eng".to_string(),
            page_seg_mode: 6,
        }
    }
}

/// Options for one extraction run. Every field has a default, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// Sampling period
    pub interval_ms: u64,
    pub confidence_threshold: f32,
    /// 0-100, partial match against `overlay_blacklist`
    pub overlay_threshold: u8,
    /// 0-100, whole-string match against the last accepted fragment
    pub dedup_threshold: u8,
    /// 0-100, whole-string match against the open cue
    pub group_threshold: u8,
    pub cue_pad_seconds: f64,
    pub overlay_blacklist: Vec<String>,
    pub roi: Option<Roi>,
    pub recognizer: RecognizerConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            confidence_threshold: 0.4,
            overlay_threshold: 80,
            dedup_threshold: 90,
            group_threshold: 90,
            cue_pad_seconds: 0.5,
            overlay_blacklist: DEFAULT_OVERLAY_BLACKLIST.iter().map(|s| s.to_string()).collect(),
            roi: None,
            recognizer: RecognizerConfig::default(),
        }
    }
}

impl ExtractionConfig {
    /// Defaults plus a crop to the bottom 30% of the frame, where burned-in
    /// subtitles usually sit.
    pub fn subtitle_band() -> Self {
        Self {
            roi: Some(Roi::bottom_band(0.3)),
            ..Self::default()
        }
    }

    /// Looser duplicate and grouping thresholds, for noisy recognizers.
    pub fn lenient() -> Self {
        Self {
            dedup_threshold: 80,
            group_threshold: 80,
            ..Self::default()
        }
    }

    pub fn from_json5_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = json5::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json5_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid("intervalMs must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidenceThreshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        for (name, value) in [
            ("overlayThreshold", self.overlay_threshold),
            ("dedupThreshold", self.dedup_threshold),
            ("groupThreshold", self.group_threshold),
        ] {
            if value > 100 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within 0-100, got {}",
                    name, value
                )));
            }
        }
        if !self.cue_pad_seconds.is_finite() || self.cue_pad_seconds < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "cuePadSeconds must be a non-negative number, got {}",
                self.cue_pad_seconds
            )));
        }
        if let Some(roi) = &self.roi {
            roi.validate().map_err(ConfigError::Invalid)?;
        }
        if self.recognizer.binary.trim().is_empty() {
            return Err(ConfigError::Invalid("recognizer.binary must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.interval_ms, 500);
        assert_eq!(config.confidence_threshold, 0.4);
        assert_eq!(config.overlay_threshold, 80);
        assert_eq!(config.dedup_threshold, 90);
        assert_eq!(config.group_threshold, 90);
        assert_eq!(config.cue_pad_seconds, 0.5);
        assert_eq!(config.overlay_blacklist.len(), 5);
        assert!(config.roi.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(ExtractionConfig::subtitle_band().roi, Some(Roi::bottom_band(0.3)));
        let lenient = ExtractionConfig::lenient();
        assert_eq!((lenient.dedup_threshold, lenient.group_threshold), (80, 80));
    }

    #[test]
    fn test_json5_partial_override() {
        let config = ExtractionConfig::from_json5_str(
            r#"{
                // sample twice a second, keep the rest
                intervalMs: 250,
                groupThreshold: 85,
                overlayBlacklist: ["subscribe"],
                roi: { kind: "pixels", x: 0, y: 600, width: 1280, height: 120 },
                recognizer: { language: "eng+fra" },
            }"#,
        )
        .unwrap();
        assert_eq!(config.interval_ms, 250);
        assert_eq!(config.group_threshold, 85);
        assert_eq!(config.dedup_threshold, 90);
        assert_eq!(config.overlay_blacklist, vec!["subscribe".to_string()]);
        assert_eq!(
            config.roi,
            Some(Roi::Pixels {
                x: 0,
                y: 600,
                width: 1280,
                height: 120
            })
        );
        assert_eq!(config.recognizer.language, "eng+fra");
        assert_eq!(config.recognizer.binary, "tesseract");
    }

    #[test]
    fn test_invalid_values_rejected() {
        for text in [
            "{ intervalMs: 0 }",
            "{ confidenceThreshold: 1.5 }",
            "{ dedupThreshold: 101 }",
            "{ cuePadSeconds: -1 }",
            "{ roi: { kind: \"relative\", left: 0.0, top: 0.9, width: 1.0, height: 0.5 } }",
        ] {
            assert!(
                matches!(ExtractionConfig::from_json5_str(text), Err(ConfigError::Invalid(_))),
                "accepted {}",
                text
            );
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ExtractionConfig::from_json5_str("{ intervalMs: "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hardsub.json5");
        fs::write(&path, "{ cuePadSeconds: 1.0 }").unwrap();
        assert_eq!(ExtractionConfig::from_path(&path).unwrap().cue_pad_seconds, 1.0);
        assert!(matches!(
            ExtractionConfig::from_path(&dir.path().join("missing.json5")),
            Err(ConfigError::Io(_))
        ));
    }
}
