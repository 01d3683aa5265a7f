//! Error types for the ledger chat assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Error, Debug)]
pub enum ChatError {

    // =============================
    // Completion Service Errors
    // =============================

    /// Network failure, timeout, rate limiting or 5xx from the completion service
    #[error("Transient service error: {0}")]
    TransientService(String),

    /// Any other non-success status; retrying will not help
    #[error("Completion service rejected request ({status}): {message}")]
    ServiceRejected { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    // =============================
    // Ledger / Input Errors
    // =============================

    #[error("Validation error: {0}")]
    Validation(String),

    // =============================
    // Resilience
    // =============================

    #[error("Operation failed after {attempts} attempts: {last_error}")]
    ExhaustedRetries {
        attempts: u32,
        last_error: Box<ChatError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ChatError {
    /// Whether another attempt at the same call could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatError::TransientService(_))
    }
}
