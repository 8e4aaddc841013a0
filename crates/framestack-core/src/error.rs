//! Error types for Framestack.

use thiserror::Error;

/// Main error type for fallible Framestack operations.
///
/// Compositing itself never returns this type; per-clip problems are
/// reported through [`crate::FrameHealth`]. These errors come from setup
/// paths: resource creation, shader linking, configuration and decoding.
#[derive(Error, Debug)]
pub enum FramestackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Shader link error: {0}")]
    Shader(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Timeline error: {0}")]
    Timeline(String),

    #[error("Effect error: {0}")]
    Effect(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Framestack operations.
pub type Result<T> = std::result::Result<T, FramestackError>;
