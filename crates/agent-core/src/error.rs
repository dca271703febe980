//! Error types for agent-core

use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type shared across crate boundaries
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// A component could not be constructed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// A request stage failed
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    /// No usable model credentials or endpoint could be resolved
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// An outbound call exceeded its deadline
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },
}

impl Error {
    /// Whether the error is fatal for a whole request rather than one stage
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ConfigurationMissing(_) | Error::InitializationFailed(_))
    }
}
