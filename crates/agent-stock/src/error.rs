//! Error types for the prediction pipeline

use agent_llm::LLMError;
use thiserror::Error;

/// Stock pipeline errors
///
/// Only [`StockError::ConfigurationMissing`] (and the LLM configuration errors
/// folded into it) is meant to reach a caller of the predictor. Everything
/// else is degraded to text by the aggregator, the tool adapters or the
/// parsers.
#[derive(Debug, Error)]
pub enum StockError {
    /// An upstream data source failed
    #[error("{source_name} unavailable: {reason}")]
    UpstreamUnavailable { source_name: String, reason: String },

    /// An upstream call exceeded its deadline
    #[error("{source_name} timed out after {secs}s")]
    Timeout { source_name: String, secs: u64 },

    /// Input is not an A-share code
    #[error("Invalid stock code: {0}")]
    InvalidCode(String),

    /// The upstream answered but had nothing for the request
    #[error("No data: {0}")]
    NoData(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Prompt template error
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// No usable model could be resolved
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Model layer error
    #[error("Model error: {0}")]
    Llm(#[from] LLMError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl StockError {
    pub fn upstream(source_name: impl Into<String>, reason: impl ToString) -> Self {
        StockError::UpstreamUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the whole request has to fail
    pub fn is_fatal(&self) -> bool {
        match self {
            StockError::ConfigurationMissing(_) => true,
            StockError::Llm(e) => e.is_configuration(),
            _ => false,
        }
    }

    /// Short reason used in dossier placeholders
    pub fn reason(&self) -> String {
        match self {
            StockError::UpstreamUnavailable { reason, .. } => reason.clone(),
            StockError::Timeout { secs, .. } => format!("timed out after {secs}s"),
            other => other.to_string(),
        }
    }
}

/// Result type alias for stock operations
pub type Result<T> = std::result::Result<T, StockError>;

impl From<StockError> for agent_core::Error {
    fn from(err: StockError) -> Self {
        if err.is_fatal() {
            agent_core::Error::ConfigurationMissing(err.to_string())
        } else {
            agent_core::Error::ProcessingFailed(err.to_string())
        }
    }
}

impl From<agent_core::Error> for StockError {
    fn from(err: agent_core::Error) -> Self {
        match err {
            agent_core::Error::ConfigurationMissing(msg) => StockError::ConfigurationMissing(msg),
            agent_core::Error::Timeout { operation, secs } => StockError::Timeout {
                source_name: operation,
                secs,
            },
            other => StockError::Other(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for StockError {
    fn from(err: anyhow::Error) -> Self {
        StockError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StockError::InvalidCode("abc".to_string());
        assert_eq!(err.to_string(), "Invalid stock code: abc");

        let err = StockError::upstream("Order Book", "HTTP 502");
        assert_eq!(err.to_string(), "Order Book unavailable: HTTP 502");
        assert_eq!(err.reason(), "HTTP 502");
    }

    #[test]
    fn test_timeout_reason() {
        let err = StockError::Timeout {
            source_name: "Chip Distribution".into(),
            secs: 10,
        };
        assert_eq!(err.reason(), "timed out after 10s");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(StockError::ConfigurationMissing("no model".into()).is_fatal());
        assert!(StockError::Llm(LLMError::ConfigurationError("empty key".into())).is_fatal());
        assert!(!StockError::Llm(LLMError::RequestFailed("503".into())).is_fatal());
        assert!(!StockError::NoData("klines".into()).is_fatal());
    }

    #[test]
    fn test_error_conversion() {
        let agent_err: agent_core::Error = StockError::NoData("x".to_string()).into();
        assert!(matches!(agent_err, agent_core::Error::ProcessingFailed(msg) if msg.contains("No data")));

        let agent_err: agent_core::Error = StockError::ConfigurationMissing("m".into()).into();
        assert!(agent_err.is_fatal());

        let back: StockError = agent_core::Error::ConfigurationMissing("m".into()).into();
        assert!(back.is_fatal());
    }
}
