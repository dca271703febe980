//! Model contract for the prediction agent
//!
//! The model is treated as an opaque capability: it accepts role-tagged
//! message parts (text and inline images) plus a declared tool catalogue and
//! returns either free text or a single tool invocation request.
//!
//! - [`messages`]: role-tagged multi-part messages
//! - [`completion`]: request/response envelopes
//! - [`provider`]: the [`LLMProvider`] trait
//! - [`catalog`]: `llm_config.json` model catalogue and [`ModelSource`] resolution
//! - [`providers`]: OpenAI-compatible HTTP provider (feature `openai`)

pub mod catalog;
pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod scripted;
pub mod tools;

pub use catalog::{
    FixedModel, ModelCatalog, ModelConfig, ModelEndpoint, ModelProviderKind, ModelSource,
    ResolvedModel,
};
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ContentPart, ImageSource, Message, Role, ToolCall};
pub use provider::LLMProvider;
pub use scripted::ScriptedProvider;
pub use tools::ToolDefinition;

#[cfg(feature = "openai")]
pub mod providers;

#[cfg(feature = "openai")]
pub use catalog::ConfiguredModels;
