//! Step-by-step record of one executor run

use serde::{Deserialize, Serialize};

/// A tool call decided by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub input_text: String,
    /// Id of the native tool call, when the provider issued one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, input_text: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            input_text: input_text.into(),
            call_id: None,
        }
    }
}

/// One iteration: what the model thought, what it did, what it saw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    pub thought: String,
    pub action: Option<ToolInvocation>,
    pub observation: Option<String>,
}

/// Append-only sequence of steps, capped at the iteration budget
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTrace {
    steps: Vec<AgentStep>,
    capacity: usize,
}

impl AgentTrace {
    pub fn new(capacity: usize) -> Self {
        Self {
            steps: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a step; returns `false` once the trace is full
    pub(crate) fn push(&mut self, step: AgentStep) -> bool {
        if self.steps.len() >= self.capacity {
            return false;
        }
        self.steps.push(step);
        true
    }

    pub fn steps(&self) -> &[AgentStep] {
        &self.steps
    }

    /// Number of tool invocations recorded
    pub fn invocations(&self) -> usize {
        self.steps.iter().filter(|s| s.action.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(action: bool) -> AgentStep {
        AgentStep {
            thought: "t".into(),
            action: action.then(|| ToolInvocation::new("Quote", "sh600519")),
            observation: action.then(|| "Price: 1700.00".to_string()),
        }
    }

    #[test]
    fn test_trace_is_bounded() {
        let mut trace = AgentTrace::new(2);
        assert!(trace.push(step(true)));
        assert!(trace.push(step(false)));
        assert!(!trace.push(step(true)));
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.invocations(), 1);
    }
}
