//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[cfg(feature = "openai")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// No usable model entry, endpoint or credential
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Failed to read model configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl LLMError {
    /// Configuration problems are fatal for a request; everything else is transient
    ///
    /// A rejected key or an unknown model id means the endpoint is unusable
    /// as configured, so those count as configuration problems too.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LLMError::ConfigurationError(_)
                | LLMError::Io(_)
                | LLMError::AuthenticationFailed
                | LLMError::ModelNotFound(_)
        )
    }
}

impl From<LLMError> for agent_core::Error {
    fn from(err: LLMError) -> Self {
        if err.is_configuration() {
            agent_core::Error::ConfigurationMissing(err.to_string())
        } else {
            agent_core::Error::ProcessingFailed(err.to_string())
        }
    }
}
