//! Error types for Lumen search.
//!
//! Errors come in two severities. [`PipelineError`] is candidate-level: one
//! image failed to read, decode, embed, or score. Those are always recovered
//! locally by logging and dropping the candidate. [`SearchError`] is
//! request-level and is always surfaced to the caller as a structured error.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Lumen operations.
#[derive(Error, Debug)]
pub enum LumenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Request-level search errors
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Model loading or per-candidate pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Candidate-level errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Reading the file from disk failed
    #[error("Read error for {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Model loading or inference setup failed (no specific image)
    #[error("Model error: {message}")]
    Model { message: String },

    /// Remote endpoint invocation failed
    #[error("Endpoint {endpoint} failed for {path}: {message}")]
    Remote {
        endpoint: String,
        path: PathBuf,
        message: String,
        /// HTTP status code, if the failure came from an HTTP response.
        status_code: Option<u16>,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Request-level errors. These abort one request, never the process.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The request payload was malformed or missing a required field
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The selected backend cannot serve the request
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The model registry could not be read
    #[error("Registry error: {0}")]
    Registry(String),

    /// The request task failed unexpectedly (panic or cancellation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for SearchError {
    fn from(e: serde_json::Error) -> Self {
        SearchError::InvalidRequest(e.to_string())
    }
}

/// Convenience type alias for Lumen results.
pub type Result<T> = std::result::Result<T, LumenError>;

/// Convenience type alias for candidate-level results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Convenience type alias for request-level results.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
