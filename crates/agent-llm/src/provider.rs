//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// A chat-completion backend
///
/// Implementations must be cheap to share behind an `Arc`; one provider
/// instance may serve many concurrent requests.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Run one model round-trip
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Provider name for logs (e.g. "deepseek")
    fn name(&self) -> &str;
}
