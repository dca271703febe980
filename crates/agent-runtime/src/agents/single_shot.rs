//! Single-shot agent (one model call, no tools)

use agent_core::Result;
use agent_llm::{CompletionRequest, LLMProvider, Message};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Configuration for a single-shot agent
#[derive(Debug, Clone)]
pub struct SingleShotConfig {
    /// Model to use
    pub model: String,

    /// System prompt
    pub system_prompt: Option<String>,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Temperature for sampling
    pub temperature: Option<f32>,

    /// Deadline for the model round-trip
    pub timeout: Duration,
}

impl Default for SingleShotConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            system_prompt: None,
            max_tokens: 4096,
            temperature: Some(0.3),
            timeout: Duration::from_secs(120),
        }
    }
}

/// An agent that sends one conversation and returns the reply text
///
/// Used for image recognition and market review, where the whole input is
/// known up front and there is nothing to look up.
///
/// # Example
///
/// ```no_run
/// use agent_runtime::{SingleShotAgent, SingleShotConfig};
/// use agent_llm::Message;
/// use std::sync::Arc;
///
/// # async fn example(provider: Arc<dyn agent_llm::LLMProvider>) -> agent_core::Result<()> {
/// let config = SingleShotConfig {
///     model: "glm-4v".to_string(),
///     ..SingleShotConfig::default()
/// };
///
/// let agent = SingleShotAgent::new(provider, config);
/// let reply = agent.complete(vec![Message::user("总结今日盘面")]).await?;
/// # Ok(())
/// # }
/// ```
pub struct SingleShotAgent {
    provider: Arc<dyn LLMProvider>,
    config: SingleShotConfig,
}

impl SingleShotAgent {
    pub fn new(provider: Arc<dyn LLMProvider>, config: SingleShotConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &SingleShotConfig {
        &self.config
    }

    /// Send the conversation and return the reply text
    ///
    /// Provider failures and timeouts are reported as errors; callers decide
    /// how to degrade.
    pub async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let mut builder = CompletionRequest::builder(&self.config.model)
            .messages(messages)
            .max_tokens(self.config.max_tokens);
        if let Some(system) = &self.config.system_prompt {
            builder = builder.system(system.clone());
        }
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }

        let response = match timeout(self.config.timeout, self.provider.complete(builder.build())).await {
            Ok(result) => result.map_err(agent_core::Error::from)?,
            Err(_) => {
                warn!(model = %self.config.model, "Single-shot model call timed out");
                return Err(agent_core::Error::Timeout {
                    operation: "model call".to_string(),
                    secs: self.config.timeout.as_secs(),
                });
            }
        };

        let text = response.message.text();
        debug!(
            model = %self.config.model,
            output_tokens = response.usage.output_tokens,
            chars = text.chars().count(),
            "Single-shot reply received"
        );
        Ok(text)
    }
}
