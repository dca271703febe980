//! Data providers exposed to the reasoning loop

use crate::provider::{DataProvider, ProviderRegistry};
use agent_core::{Context, Result};
use agent_tools::{Tool, ToolRegistry};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// A [`DataProvider`] callable as a tool
///
/// The tool name is the section name without spaces (`Order Book` becomes
/// `OrderBook`); description and input hint come from the provider.
pub struct ProviderTool {
    name: String,
    provider: Arc<dyn DataProvider>,
}

impl ProviderTool {
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        let name = provider.name().split_whitespace().collect();
        Self { name, provider }
    }
}

#[async_trait]
impl Tool for ProviderTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        self.provider.description()
    }

    fn input_hint(&self) -> &str {
        self.provider.input_hint()
    }

    async fn call(&self, ctx: &Context, input: &str) -> Result<String> {
        let cleaned = clean_input(input);
        let argument = match (cleaned.is_empty(), ctx.stock_code()) {
            (true, Some(code)) => code.to_string(),
            _ => cleaned,
        };
        debug!(tool = %self.name, input = %argument, "Provider tool called");
        Ok(self.provider.fetch(ctx, &argument).await?)
    }
}

/// Every provider in the registry, in registry order
pub fn provider_tools(registry: &ProviderRegistry) -> ToolRegistry {
    registry
        .iter()
        .fold(ToolRegistry::new(), |tools, provider| {
            tools.with(Arc::new(ProviderTool::new(Arc::clone(provider))))
        })
}

/// Reduce a model-written action input to one argument
///
/// Keeps the first line and first word, drops an echoed `Observation:`
/// prefix, surrounding quotes and control characters.
fn clean_input(input: &str) -> String {
    let first_line = input.trim().lines().next().unwrap_or_default();
    let first_word = first_line.split_whitespace().next().unwrap_or_default();
    let word = first_word.strip_prefix("Observation:").unwrap_or(first_word);
    word.trim_matches(|c: char| matches!(c, '"' | '\'' | '`') || c.is_whitespace())
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}
