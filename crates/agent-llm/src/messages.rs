//! Message types for model communication
//!
//! A [`Message`] is a role plus an ordered list of [`ContentPart`]s. Text and
//! inline images cover the request side; tool calls and tool results cover
//! providers with native function calling.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Image payload for multi-modal messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    Url { url: String },
    Base64 { media_type: String, data: String },
}

impl ImageSource {
    /// Encode raw image bytes, sniffing the media type from magic bytes
    ///
    /// Unknown formats are labelled `image/png`, which vision endpoints accept
    /// as a generic default.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        ImageSource::Base64 {
            media_type: sniff_media_type(bytes).to_string(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Render as a URL usable by OpenAI-style `image_url` parts
    pub fn to_url(&self) -> String {
        match self {
            ImageSource::Url { url } => url.clone(),
            ImageSource::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
        }
    }
}

fn sniff_media_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/png",
    }
}

/// A tool invocation requested natively by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// One part of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { source: ImageSource },
    ToolUse(ToolCall),
    ToolResult { tool_use_id: String, content: String },
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl Message {
    fn text_with_role(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![ContentPart::Text { text: text.into() }],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text_with_role(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text_with_role(Role::Assistant, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::text_with_role(Role::System, text)
    }

    /// User message carrying an instruction and one image
    pub fn user_with_image(text: impl Into<String>, image: ImageSource) -> Self {
        Self {
            role: Role::User,
            parts: vec![
                ContentPart::Text { text: text.into() },
                ContentPart::Image { source: image },
            ],
        }
    }

    /// Result of a native tool call, addressed by its id
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![ContentPart::ToolResult {
                tool_use_id: tool_use_id.into(),
                content: content.into(),
            }],
        }
    }

    /// All text parts joined by newlines; empty when the message has none
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// First native tool call in the message, if any
    pub fn tool_call(&self) -> Option<&ToolCall> {
        self.parts.iter().find_map(|part| match part {
            ContentPart::ToolUse(call) => Some(call),
            _ => None,
        })
    }

    pub fn has_image(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, ContentPart::Image { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_constructors() {
        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::assistant("ok").text(), "ok");
        assert_eq!(Message::system("rules").role, Role::System);
    }

    #[test]
    fn test_text_joins_parts_and_skips_images() {
        let msg = Message {
            role: Role::Assistant,
            parts: vec![
                ContentPart::Text { text: "a".into() },
                ContentPart::Image {
                    source: ImageSource::Url { url: "u".into() },
                },
                ContentPart::Text { text: "b".into() },
            ],
        };
        assert_eq!(msg.text(), "a\nb");
    }

    #[test]
    fn test_tool_call_lookup() {
        let msg = Message {
            role: Role::Assistant,
            parts: vec![ContentPart::ToolUse(ToolCall {
                id: "call_1".into(),
                name: "StockQuote".into(),
                input: serde_json::json!({"input": "sh600519"}),
            })],
        };
        assert_eq!(msg.tool_call().map(|c| c.name.as_str()), Some("StockQuote"));
        assert!(Message::user("x").tool_call().is_none());
    }

    #[test]
    fn test_image_media_type_sniffing() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A];
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0];
        let webp = *b"RIFF\0\0\0\0WEBPVP8 ";

        let media = |bytes: &[u8]| match ImageSource::from_bytes(bytes) {
            ImageSource::Base64 { media_type, .. } => media_type,
            ImageSource::Url { .. } => unreachable!(),
        };
        assert_eq!(media(&png), "image/png");
        assert_eq!(media(&jpeg), "image/jpeg");
        assert_eq!(media(&webp), "image/webp");
        assert_eq!(media(b"??"), "image/png");
    }

    #[test]
    fn test_data_url() {
        let source = ImageSource::Base64 {
            media_type: "image/jpeg".into(),
            data: "AAAA".into(),
        };
        assert_eq!(source.to_url(), "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn test_user_with_image() {
        let msg = Message::user_with_image("find codes", ImageSource::from_bytes(b"GIF89a"));
        assert!(msg.has_image());
        assert_eq!(msg.text(), "find codes");
    }
}
