//! Text protocol for models without native function calling

use agent_tools::ToolRegistry;

/// Stop sequence that keeps the model from inventing its own observations
pub const OBSERVATION_STOP: &str = "\nObservation:";

/// Render the tool catalogue and the Thought/Action/Observation format
///
/// Returns an empty string for an empty catalogue so callers can append it
/// unconditionally.
pub fn render_tool_instructions(tools: &ToolRegistry) -> String {
    if tools.is_empty() {
        return String::new();
    }

    let mut out = String::from("You have access to the following tools:\n\n");
    for tool in tools.iter() {
        out.push_str(&format!(
            "{}: {} (input: {})\n",
            tool.name(),
            tool.description(),
            tool.input_hint()
        ));
    }
    out.push_str(&format!(
        "\nUse the following format:\n\n\
         Thought: you should always think about what to do\n\
         Action: the action to take, should be one of [{names}]\n\
         Action Input: the input to the action\n\
         Observation: the result of the action\n\
         ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
         Thought: I now know the final answer\n\
         Final Answer: the final answer to the original input question\n",
        names = tools.names().join(", ")
    ));
    out
}

/// Observation message text fed back after a text-protocol tool call
pub fn observation_message(observation: &str) -> String {
    format!("Observation: {observation}")
}
