//! Decoding model output into the next action
//!
//! Two wire shapes are understood:
//!
//! - native tool calls (`ContentPart::ToolUse`) from providers with function calling;
//! - the text protocol rendered by [`crate::react`]:
//!
//! ```text
//! Thought: I need the latest quote
//! Action: StockQuote
//! Action Input: sh600519
//! ```
//!
//! or `Final Answer: ...`. Text matching neither shape is taken as a final
//! answer; [`Decoded::well_formed`] records that the format was violated.

use crate::trace::ToolInvocation;
use agent_llm::Message;
use agent_llm::tools::text_argument;
use regex::Regex;
use std::sync::LazyLock;

const FINAL_ANSWER: &str = "Final Answer:";

static ACTION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*:\s*(?P<tool>[^\n]*?)\s*\n\s*Action\s*Input\s*:\s*(?P<input>.*)").ok()
});

/// What the model wants to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentDecision {
    FinalAnswer(String),
    Invoke(ToolInvocation),
}

/// A decision plus the reasoning text that preceded it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub thought: String,
    pub decision: AgentDecision,
    /// `false` when the text matched neither protocol shape
    pub well_formed: bool,
}

/// Decode one assistant message
pub fn decode(message: &Message) -> Decoded {
    if let Some(call) = message.tool_call() {
        return Decoded {
            thought: message.text().trim().to_string(),
            decision: AgentDecision::Invoke(ToolInvocation {
                tool_name: call.name.clone(),
                input_text: text_argument(&call.input),
                call_id: Some(call.id.clone()),
            }),
            well_formed: true,
        };
    }
    decode_text(&message.text())
}

/// Decode the text protocol
pub fn decode_text(text: &str) -> Decoded {
    if let Some(idx) = text.find(FINAL_ANSWER) {
        let answer = text[idx + FINAL_ANSWER.len()..].trim();
        return Decoded {
            thought: strip_thought(&text[..idx]),
            decision: AgentDecision::FinalAnswer(if answer.is_empty() {
                text.trim().to_string()
            } else {
                answer.to_string()
            }),
            well_formed: true,
        };
    }

    if let Some(caps) = ACTION_RE.as_ref().and_then(|re| re.captures(text)) {
        let tool = clean_tool_name(&caps["tool"]);
        if !tool.is_empty() {
            let start = caps.get(0).map_or(0, |m| m.start());
            return Decoded {
                thought: strip_thought(&text[..start]),
                decision: AgentDecision::Invoke(ToolInvocation::new(
                    tool,
                    clean_action_input(&caps["input"]),
                )),
                well_formed: true,
            };
        }
    }

    Decoded {
        thought: String::new(),
        decision: AgentDecision::FinalAnswer(text.trim().to_string()),
        well_formed: false,
    }
}

fn strip_thought(text: &str) -> String {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("Thought:")
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

fn clean_tool_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '*' | '[' | ']'))
        .trim()
        .to_string()
}

/// Cut the input at any hallucinated observation and drop wrapping quotes
fn clean_action_input(raw: &str) -> String {
    let cut = raw.find("Observation:").map_or(raw, |idx| &raw[..idx]);
    cut.trim()
        .trim_matches(|c: char| matches!(c, '`' | '"' | '\''))
        .trim()
        .to_string()
}
