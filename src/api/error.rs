use serde::{Deserialize, Serialize};

use crate::core::error::{ConfigError, ExtractError, SaveError};

/// 字幕提取 API 错误类型，FRB 友好的设计
///
/// `error_type` 为固定标签，`message` 用于展示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error_type: String,
    pub message: String,
}

impl ApiError {
    fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn busy() -> Self {
        Self::new("Busy", "an extraction is already running")
    }

    pub(crate) fn idle() -> Self {
        Self::new("Idle", "no extraction has been started")
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new("Internal", message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        Self::new("Config", e.to_string())
    }
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        let error_type = match &e {
            ExtractError::SourceUnavailable(_) => "SourceUnavailable",
            ExtractError::Config(_) => "Config",
            ExtractError::Spawn(_) => "Spawn",
            ExtractError::WorkerPanicked => "WorkerPanicked",
        };
        Self::new(error_type, e.to_string())
    }
}

impl From<SaveError> for ApiError {
    fn from(e: SaveError) -> Self {
        Self::new("Save", e.to_string())
    }
}
