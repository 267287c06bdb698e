//! Error types for DMP

use thiserror::Error;

/// Result type alias for DMP operations
pub type Result<T> = std::result::Result<T, DmpError>;

/// Main error type for DMP
#[derive(Error, Debug)]
pub enum DmpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
