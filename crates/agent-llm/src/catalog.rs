//! Model catalogue and per-request model resolution
//!
//! The catalogue mirrors `conf/llm_config.json`:
//!
//! ```json
//! {
//!   "current_provider": "deepseek",
//!   "models": {
//!     "deepseek": { "api_key": "sk-...", "model_name": "deepseek-chat" },
//!     "zhipu":    { "api_key": "...", "model_name": "glm-4v", "base_url": "https://..." }
//!   }
//! }
//! ```
//!
//! A request may name a model (by entry key or by `model_name`); otherwise,
//! or when the named model is not in the catalogue, the `current_provider`
//! entry is used. Only a missing current entry or an empty key is a
//! configuration error, and that fails the request.

use crate::{LLMError, LLMProvider, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Supported OpenAI-compatible vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProviderKind {
    #[serde(rename = "openai")]
    OpenAI,
    Zhipu,
    Qwen,
    Doubao,
    #[serde(rename = "deepseek")]
    DeepSeek,
}

impl ModelProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProviderKind::OpenAI => "openai",
            ModelProviderKind::Zhipu => "zhipu",
            ModelProviderKind::Qwen => "qwen",
            ModelProviderKind::Doubao => "doubao",
            ModelProviderKind::DeepSeek => "deepseek",
        }
    }

    /// Base URL used when an entry does not override it
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ModelProviderKind::OpenAI => "https://api.openai.com/v1",
            ModelProviderKind::Zhipu => "https://open.bigmodel.cn/api/paas/v4",
            ModelProviderKind::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            ModelProviderKind::Doubao => "https://ark.cn-beijing.volces.com/api/v3",
            ModelProviderKind::DeepSeek => "https://api.deepseek.com",
        }
    }
}

impl fmt::Display for ModelProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelProviderKind {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ModelProviderKind::OpenAI),
            "zhipu" | "glm" => Ok(ModelProviderKind::Zhipu),
            "qwen" | "dashscope" => Ok(ModelProviderKind::Qwen),
            "doubao" | "ark" => Ok(ModelProviderKind::Doubao),
            "deepseek" => Ok(ModelProviderKind::DeepSeek),
            other => Err(LLMError::ConfigurationError(format!(
                "unsupported model provider '{other}'"
            ))),
        }
    }
}

/// One catalogue entry as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Vendor; inferred from the entry key when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ModelProviderKind>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub model_name: String,
}

/// A fully resolved endpoint: vendor, URL, key and model id
#[derive(Clone, PartialEq, Eq)]
pub struct ModelEndpoint {
    pub entry: String,
    pub kind: ModelProviderKind,
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
}

impl fmt::Debug for ModelEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEndpoint")
            .field("entry", &self.entry)
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

/// The set of configured models
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub current_provider: String,
    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,
}

impl ModelCatalog {
    /// Load a catalogue from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            LLMError::ConfigurationError(format!("invalid model config {}: {e}", path.display()))
        })
    }

    /// Build a single-entry catalogue from `LLM_PROVIDER`, `LLM_API_KEY`, `LLM_MODEL`, `LLM_BASE_URL`
    ///
    /// Returns `None` when no API key is set.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let Some(api_key) = lookup("LLM_API_KEY").filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };
        let kind = match lookup("LLM_PROVIDER") {
            Some(name) => name.parse()?,
            None => ModelProviderKind::OpenAI,
        };
        let model_name = lookup("LLM_MODEL").ok_or_else(|| {
            LLMError::ConfigurationError("LLM_MODEL must be set alongside LLM_API_KEY".to_string())
        })?;

        let mut models = BTreeMap::new();
        models.insert(
            kind.as_str().to_string(),
            ModelConfig {
                provider: Some(kind),
                api_key,
                base_url: lookup("LLM_BASE_URL"),
                model_name,
            },
        );
        Ok(Some(Self {
            current_provider: kind.as_str().to_string(),
            models,
        }))
    }

    /// Resolve a requested model, or the current provider when `requested` is `None` or unknown
    pub fn resolve(&self, requested: Option<&str>) -> Result<ModelEndpoint> {
        let requested = requested.map(str::trim).filter(|name| !name.is_empty());
        let named = requested.and_then(|name| {
            let found = self
                .models
                .iter()
                .find(|(key, cfg)| key.as_str() == name || cfg.model_name == name);
            if found.is_none() {
                tracing::warn!(
                    requested = name,
                    current = %self.current_provider,
                    "Model not found in config, falling back to current provider"
                );
            }
            found
        });
        let (entry, config) = match named {
            Some(found) => found,
            None => self
                .models
                .get_key_value(self.current_provider.as_str())
                .ok_or_else(|| {
                    LLMError::ConfigurationError(format!(
                        "current provider '{}' has no model entry",
                        self.current_provider
                    ))
                })?,
        };

        if config.api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError(format!(
                "model entry '{entry}' has no api_key"
            )));
        }

        let kind = match config.provider {
            Some(kind) => kind,
            None => entry.parse().unwrap_or(ModelProviderKind::OpenAI),
        };
        let base_url = config
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| kind.default_base_url().to_string());

        Ok(ModelEndpoint {
            entry: entry.clone(),
            kind,
            api_key: config.api_key.clone(),
            base_url,
            model_name: config.model_name.clone(),
        })
    }
}

/// A provider bound to the model id it should be called with
#[derive(Clone)]
pub struct ResolvedModel {
    pub provider: Arc<dyn LLMProvider>,
    pub model: String,
}

/// Resolves the model to use for one request
pub trait ModelSource: Send + Sync {
    fn resolve(&self, requested: Option<&str>) -> Result<ResolvedModel>;
}

/// Always hands out the same provider and model
pub struct FixedModel {
    provider: Arc<dyn LLMProvider>,
    model: String,
}

impl FixedModel {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl ModelSource for FixedModel {
    fn resolve(&self, _requested: Option<&str>) -> Result<ResolvedModel> {
        Ok(ResolvedModel {
            provider: Arc::clone(&self.provider),
            model: self.model.clone(),
        })
    }
}

/// Builds an OpenAI-compatible provider per request from a catalogue
#[cfg(feature = "openai")]
pub struct ConfiguredModels {
    catalog: Option<ModelCatalog>,
    timeout_secs: u64,
}

#[cfg(feature = "openai")]
impl ConfiguredModels {
    pub fn new(catalog: Option<ModelCatalog>) -> Self {
        Self {
            catalog,
            timeout_secs: 120,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[cfg(feature = "openai")]
impl ModelSource for ConfiguredModels {
    fn resolve(&self, requested: Option<&str>) -> Result<ResolvedModel> {
        use crate::providers::{OpenAIConfig, OpenAIProvider};

        let catalog = self.catalog.as_ref().ok_or_else(|| {
            LLMError::ConfigurationError("no model configuration loaded".to_string())
        })?;
        let endpoint = catalog.resolve(requested)?;
        tracing::info!(
            vendor = %endpoint.kind,
            model = %endpoint.model_name,
            "Resolved model"
        );

        let config = OpenAIConfig::new(endpoint.api_key)
            .with_api_base(endpoint.base_url)
            .with_timeout(self.timeout_secs)
            .with_vendor(endpoint.kind.as_str());
        Ok(ResolvedModel {
            provider: Arc::new(OpenAIProvider::with_config(config)?),
            model: endpoint.model_name,
        })
    }
}
