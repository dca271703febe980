//! Tool trait definition

use agent_core::{Context, Result};
use async_trait::async_trait;

/// A capability exposed to the model
///
/// `name` and `description` are shown to the model verbatim and form part of
/// the prompt protocol, so they must describe what `call` actually does.
///
/// `call` may return `Err`; the executor turns any error into an
/// `"Error: ..."` observation and keeps the loop running.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to address the tool
    fn name(&self) -> &str;

    /// What the tool does and when to use it
    fn description(&self) -> &str;

    /// Expected shape of the input text
    fn input_hint(&self) -> &str {
        "free text"
    }

    /// Run the tool on one input string
    async fn call(&self, ctx: &Context, input: &str) -> Result<String>;
}
