//! Tool declarations shown to the model

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A tool as the model sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    /// Shown to the model verbatim
    pub description: String,
    /// JSON schema of the arguments for native function calling
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Tool taking one free-text argument named `input`
    pub fn text_input(
        name: impl Into<String>,
        description: impl Into<String>,
        input_hint: &str,
    ) -> Self {
        Self::new(
            name,
            description,
            json!({
                "type": "object",
                "properties": {
                    "input": { "type": "string", "description": input_hint }
                },
                "required": ["input"]
            }),
        )
    }
}

/// Recover the free-text argument from native tool-call arguments
///
/// Accepts `{"input": "..."}`, a bare JSON string, or any other value (which
/// is passed through as compact JSON).
pub fn text_argument(input: &Value) -> String {
    match input {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("input") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => input.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
