//! Error types for platescan
//!
//! Only [`ExtractError`] reaches callers of the engine. Recognizer failures
//! ([`OcrError`], [`PlateServiceError`]) are recorded in the extraction report
//! and contribute zero candidates.

use thiserror::Error;

/// Caller-input errors returned by `PlateExtractor::extract`
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Image buffer is empty")]
    EmptyImage,

    #[error("Unreadable image: {0}")]
    InvalidImage(#[from] image::ImageError),
}

/// Failure of a single OCR pass
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OcrError {
    #[error("OCR engine init failed: {0}")]
    Init(String),

    #[error("OCR recognition failed: {0}")]
    Recognize(String),

    #[error("OCR worker failed: {0}")]
    Worker(String),
}

/// Remote plate-recognition service errors
#[derive(Debug, Error)]
pub enum PlateServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Plate service timed out")]
    Timeout,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid API key")]
    InvalidApiKey,
}

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialise error: {0}")]
    Serialize(#[from] serde_json::Error),
}
