//! Provider that replays canned replies
//!
//! Used by tests across the workspace and for offline dry runs. Each call pops
//! the next reply; a repeating provider returns the same reply forever.

use crate::{CompletionRequest, CompletionResponse, LLMError, LLMProvider, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

enum Reply {
    Text(String),
    Response(CompletionResponse),
    Fail(String),
    Error(fn() -> LLMError),
}

impl Reply {
    fn produce(&self) -> Result<CompletionResponse> {
        match self {
            Reply::Text(text) => Ok(CompletionResponse::text(text.clone())),
            Reply::Response(response) => Ok(response.clone()),
            Reply::Fail(reason) => Err(LLMError::RequestFailed(reason.clone())),
            Reply::Error(make) => Err(make()),
        }
    }
}

/// Scripted [`LLMProvider`]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    repeat_last: bool,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    /// Replies returned in order; calls past the end fail
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|s| Reply::Text(s.into())).collect()),
            repeat_last: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The same reply on every call
    pub fn repeating(reply: impl Into<String>) -> Self {
        let mut provider = Self::new([reply.into()]);
        provider.repeat_last = true;
        provider
    }

    /// Queue a full response (e.g. one carrying a native tool call)
    pub fn push_response(self, response: CompletionResponse) -> Self {
        self.lock_replies().push_back(Reply::Response(response));
        self
    }

    /// Queue a failing call
    pub fn push_failure(self, reason: impl Into<String>) -> Self {
        self.lock_replies().push_back(Reply::Fail(reason.into()));
        self
    }

    /// Queue a call failing with a specific error
    pub fn push_error(self, make: fn() -> LLMError) -> Self {
        self.lock_replies().push_back(Reply::Error(make));
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Reply>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let mut replies = self.lock_replies();
        if self.repeat_last && replies.len() == 1 {
            return replies
                .front()
                .map_or_else(|| Err(exhausted()), Reply::produce);
        }
        match replies.pop_front() {
            Some(reply) => reply.produce(),
            None => Err(exhausted()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn exhausted() -> LLMError {
    LLMError::UnexpectedResponse("scripted provider has no replies left".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest::builder("m").build()
    }

    #[tokio::test]
    async fn test_replays_in_order_then_fails() {
        let provider = ScriptedProvider::new(["one", "two"]);
        assert_eq!(provider.complete(request()).await.unwrap().message.text(), "one");
        assert_eq!(provider.complete(request()).await.unwrap().message.text(), "two");
        assert!(provider.complete(request()).await.is_err());
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_repeating() {
        let provider = ScriptedProvider::repeating("again");
        for _ in 0..4 {
            assert_eq!(provider.complete(request()).await.unwrap().message.text(), "again");
        }
    }

    #[tokio::test]
    async fn test_failure_entry() {
        let provider = ScriptedProvider::new(Vec::<String>::new()).push_failure("boom");
        let err = provider.complete(request()).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
