//! Error types for ollamastream
//!
//! Every streaming operation resolves to one of three outcomes: a completed
//! result, a propagated fault carrying the original cause, or cancellation.

use thiserror::Error;

/// Main error type for streaming adapters and the bundled Ollama service
#[derive(Error, Debug)]
pub enum StreamError {
    /// Ollama API errors (non-success status or in-stream error object)
    #[error("Ollama API error: {0}")]
    OllamaApiError(String),

    /// The named model does not exist on the server
    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    /// Streaming transport errors
    #[error("Streaming error: {0}")]
    StreamingError(String),

    /// JSON framing errors
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    /// Raised by a per-chunk observer
    #[error("Chunk callback failed: {0}")]
    CallbackError(String),

    /// Caller-initiated abort
    #[error("Operation cancelled")]
    Cancelled,

    /// The background task panicked or was torn down
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// No Tokio runtime to dispatch onto
    #[error("No async runtime available: {0}")]
    RuntimeUnavailable(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for streaming operations
pub type Result<T> = std::result::Result<T, StreamError>;

impl StreamError {
    /// Build a callback failure from any displayable cause
    pub fn callback(cause: impl std::fmt::Display) -> Self {
        StreamError::CallbackError(cause.to_string())
    }

    /// True when the operation ended because its token was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamError::Cancelled)
    }
}

/// Convert anyhow errors to StreamError
impl From<anyhow::Error> for StreamError {
    fn from(err: anyhow::Error) -> Self {
        StreamError::Generic(err.to_string())
    }
}
