//! Request-scoped context
//!
//! One `Context` is created per prediction request and handed by reference to
//! every data provider and tool invoked while serving it. It is a small
//! key-value bag with typed accessors for the fields the pipeline relies on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Well-known context keys
pub mod keys {
    /// Unique id of the request, used to correlate log lines
    pub const REQUEST_ID: &str = "request_id";
    /// Normalized stock code the request is about (e.g. "sh600519")
    pub const STOCK_CODE: &str = "stock_code";
    /// Model name resolved for this request
    pub const MODEL: &str = "model";
    /// Output language for model-facing prompts (e.g. "zh")
    pub const LANGUAGE: &str = "language";
}

/// Context passed to providers and tools during one request
///
/// # Example
///
/// ```
/// use agent_core::Context;
///
/// let ctx = Context::for_request()
///     .with_stock_code("sh600519")
///     .with_model("glm-4");
///
/// assert_eq!(ctx.stock_code(), Some("sh600519"));
/// assert!(ctx.request_id().is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    data: HashMap<String, serde_json::Value>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context stamped with a fresh request id
    pub fn for_request() -> Self {
        let mut ctx = Self::new();
        ctx.insert(keys::REQUEST_ID, serde_json::json!(Uuid::new_v4().to_string()));
        ctx
    }

    pub fn with_stock_code(mut self, code: impl Into<String>) -> Self {
        self.insert(keys::STOCK_CODE, serde_json::json!(code.into()));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.insert(keys::MODEL, serde_json::json!(model.into()));
        self
    }

    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.insert(keys::LANGUAGE, serde_json::json!(lang.into()));
        self
    }

    pub fn request_id(&self) -> Option<&str> {
        self.get_str(keys::REQUEST_ID)
    }

    pub fn stock_code(&self) -> Option<&str> {
        self.get_str(keys::STOCK_CODE)
    }

    pub fn model(&self) -> Option<&str> {
        self.get_str(keys::MODEL)
    }

    pub fn language(&self) -> Option<&str> {
        self.get_str(keys::LANGUAGE)
    }

    /// Insert a raw JSON value
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Get a raw JSON value
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    /// Insert a value after serializing it to JSON
    pub fn insert_typed<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> crate::Result<()> {
        let json_value = serde_json::to_value(value).map_err(|e| {
            crate::Error::ProcessingFailed(format!("Failed to serialize context value: {e}"))
        })?;
        self.data.insert(key.into(), json_value);
        Ok(())
    }

    /// Read a value back into a concrete type
    pub fn get_typed<T: for<'de> Deserialize<'de>>(&self, key: &str) -> crate::Result<Option<T>> {
        self.data
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    crate::Error::ProcessingFailed(format!(
                        "Failed to deserialize context value '{key}': {e}"
                    ))
                })
            })
            .transpose()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_empty() {
        let ctx = Context::new();
        assert!(ctx.is_empty());
        assert!(ctx.request_id().is_none());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = Context::for_request();
        let b = Context::for_request();
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn test_builder_accessors() {
        let ctx = Context::for_request()
            .with_stock_code("sz000001")
            .with_model("deepseek-chat")
            .with_language("zh");

        assert_eq!(ctx.stock_code(), Some("sz000001"));
        assert_eq!(ctx.model(), Some("deepseek-chat"));
        assert_eq!(ctx.language(), Some("zh"));
        assert_eq!(ctx.len(), 4);
    }

    #[test]
    fn test_typed_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Window {
            days: u32,
        }

        let mut ctx = Context::new();
        ctx.insert_typed("window", &Window { days: 30 }).unwrap();

        let back: Option<Window> = ctx.get_typed("window").unwrap();
        assert_eq!(back, Some(Window { days: 30 }));
        assert!(ctx.get_typed::<Window>("missing").unwrap().is_none());
    }

    #[test]
    fn test_typed_mismatch_is_error() {
        let mut ctx = Context::new();
        ctx.insert("days", serde_json::json!("thirty"));
        assert!(ctx.get_typed::<u32>("days").is_err());
    }
}
