//! Bounded reason/act/observe executor
//!
//! One run walks `Start -> Thinking -> (ToolCall -> Observing)* -> Finished`
//! or ends in `IterationExceeded` once `max_iterations` model turns have been
//! spent. Each turn issues at most one tool invocation, so a run never makes
//! more than `max_iterations` tool calls.
//!
//! Nothing inside the loop aborts a run:
//! - unknown tools come back to the model as an `unknown tool` observation;
//! - tool errors and tool timeouts become `Error: ...` observations;
//! - output that breaks the text protocol is accepted as the final answer;
//! - a failed or timed-out model call ends the run with the best text so far.
//!
//! The caller always receives an [`ExecutionReport`] with a raw transcript.
//! A model call rejected as misconfigured (bad key, unknown model) ends the
//! run as [`ExecutionOutcome::ModelRejected`] so the caller can fail the
//! request instead of degrading it.

use crate::decision::{AgentDecision, decode};
use crate::react::{OBSERVATION_STOP, observation_message, render_tool_instructions};
use crate::trace::{AgentStep, AgentTrace, ToolInvocation};
use agent_core::Context;
use agent_llm::{CompletionRequest, ContentPart, LLMProvider, Message, ToolDefinition};
use agent_tools::ToolRegistry;
use agent_utils::text::preview;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Observer hooks for a run
#[async_trait]
pub trait ExecutorEventHandler: Send + Sync {
    async fn on_tool_start(&self, _invocation: &ToolInvocation) {}

    async fn on_tool_done(&self, _invocation: &ToolInvocation, _observation: &str, _duration_ms: u64) {}

    async fn on_complete(&self, _outcome: &ExecutionOutcome, _transcript: &str) {}
}

/// Handler that ignores every event
pub struct NoOpEventHandler;

#[async_trait]
impl ExecutorEventHandler for NoOpEventHandler {}

/// Configuration for one executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Model id passed to the provider
    pub model: String,

    /// Task framing placed before the tool catalogue in the system prompt
    pub system_prompt: Option<String>,

    /// Model turns per run, and therefore the cap on tool invocations
    pub max_iterations: usize,

    pub max_tokens: usize,

    pub temperature: Option<f32>,

    /// Deadline for each model round-trip
    pub model_timeout: Duration,

    /// Deadline for each tool call
    pub tool_timeout: Duration,

    /// Also send the catalogue as native tool definitions
    pub native_tools: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            system_prompt: None,
            max_iterations: 5,
            max_tokens: 4096,
            temperature: Some(0.3),
            model_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(10),
            native_tools: false,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The model produced a final answer
    Finished,
    /// The iteration budget ran out; the transcript is the last model output
    IterationExceeded,
    /// A model call failed or timed out
    ModelFailed(String),
    /// The endpoint refused the configured credentials or model
    ModelRejected(String),
}

impl ExecutionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionOutcome::Finished => "finished",
            ExecutionOutcome::IterationExceeded => "iteration_exceeded",
            ExecutionOutcome::ModelFailed(_) => "model_failed",
            ExecutionOutcome::ModelRejected(_) => "model_rejected",
        }
    }
}

/// Result of one run
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub outcome: ExecutionOutcome,
    /// Unstructured text for downstream parsing
    pub transcript: String,
    pub trace: AgentTrace,
}

/// Runs the bounded tool loop against one provider and catalogue
pub struct ReasoningAgentExecutor {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    config: ExecutorConfig,
    event_handler: Arc<dyn ExecutorEventHandler>,
}

impl ReasoningAgentExecutor {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
            event_handler: Arc::new(NoOpEventHandler),
        }
    }

    pub fn builder() -> ReasoningAgentExecutorBuilder {
        ReasoningAgentExecutorBuilder::new()
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.event_handler = handler;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run the loop on a single user prompt
    pub async fn run(&self, ctx: &Context, prompt: impl Into<String>) -> ExecutionReport {
        self.run_messages(ctx, vec![Message::user(prompt)]).await
    }

    /// Run the loop on an initial conversation
    #[instrument(
        skip(self, ctx, conversation),
        fields(
            request_id = ctx.request_id().unwrap_or("-"),
            model = %self.config.model,
            max_iterations = self.config.max_iterations
        )
    )]
    pub async fn run_messages(&self, ctx: &Context, conversation: Vec<Message>) -> ExecutionReport {
        let mut conversation = conversation;
        let mut trace = AgentTrace::new(self.config.max_iterations);
        let mut last_text = String::new();
        let system = self.system_prompt();
        let definitions = self.tool_definitions();

        for iteration in 1..=self.config.max_iterations {
            info!(iteration, "Agent iteration started");

            let request = self.build_request(&system, &definitions, &conversation);
            let response = match timeout(self.config.model_timeout, self.provider.complete(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) if e.is_configuration() => {
                    warn!(iteration, error = %e, "Model endpoint rejected the configuration");
                    return self.finish(ExecutionOutcome::ModelRejected(e.to_string()), last_text, trace).await;
                }
                Ok(Err(e)) => {
                    warn!(iteration, error = %e, "Model call failed");
                    return self.finish(ExecutionOutcome::ModelFailed(e.to_string()), last_text, trace).await;
                }
                Err(_) => {
                    let reason = format!(
                        "model call timed out after {}s",
                        self.config.model_timeout.as_secs()
                    );
                    warn!(iteration, "{reason}");
                    return self.finish(ExecutionOutcome::ModelFailed(reason), last_text, trace).await;
                }
            };

            last_text = response.message.text();
            debug!(
                stop_reason = ?response.stop_reason,
                output_tokens = response.usage.output_tokens,
                preview = %preview(&last_text, 300),
                "Model response received"
            );

            let decoded = decode(&response.message);
            if !decoded.well_formed {
                warn!(iteration, "Model output broke the tool protocol; treating it as the final answer");
            }

            match decoded.decision {
                AgentDecision::FinalAnswer(answer) => {
                    trace.push(AgentStep {
                        thought: decoded.thought,
                        action: None,
                        observation: None,
                    });
                    info!(iteration, invocations = trace.invocations(), "Agent finished");
                    return self.finish(ExecutionOutcome::Finished, answer, trace).await;
                }
                AgentDecision::Invoke(invocation) => {
                    let observation = self.invoke(ctx, &invocation).await;
                    match &invocation.call_id {
                        Some(id) => {
                            // only the executed call may stay; each tool_use needs a matching result
                            let mut message = response.message;
                            message
                                .parts
                                .retain(|part| !matches!(part, ContentPart::ToolUse(call) if call.id != *id));
                            conversation.push(message);
                            conversation.push(Message::tool_result(id.clone(), observation.clone()));
                        }
                        None => {
                            conversation.push(Message::assistant(last_text.trim_end()));
                            conversation.push(Message::user(observation_message(&observation)));
                        }
                    }
                    trace.push(AgentStep {
                        thought: decoded.thought,
                        action: Some(invocation),
                        observation: Some(observation),
                    });
                }
            }
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "Iteration budget exhausted without a final answer"
        );
        self.finish(ExecutionOutcome::IterationExceeded, last_text, trace).await
    }

    async fn finish(
        &self,
        outcome: ExecutionOutcome,
        text: String,
        trace: AgentTrace,
    ) -> ExecutionReport {
        let transcript = match &outcome {
            ExecutionOutcome::ModelFailed(reason) | ExecutionOutcome::ModelRejected(reason)
                if text.trim().is_empty() =>
            {
                format!("Analysis unavailable: {reason}")
            }
            _ => text,
        };
        self.event_handler.on_complete(&outcome, &transcript).await;
        ExecutionReport {
            outcome,
            transcript,
            trace,
        }
    }

    /// Call one tool, always producing an observation string
    async fn invoke(&self, ctx: &Context, invocation: &ToolInvocation) -> String {
        let Some(tool) = self.tools.get(&invocation.tool_name) else {
            warn!(tool = %invocation.tool_name, "Model requested an unknown tool");
            return format!(
                "unknown tool '{}'. Available tools: {}",
                invocation.tool_name,
                self.tools.names().join(", ")
            );
        };

        info!(
            tool = %invocation.tool_name,
            input = %preview(&invocation.input_text, 200),
            "Executing tool"
        );
        self.event_handler.on_tool_start(invocation).await;

        let started = Instant::now();
        let observation = match timeout(
            self.config.tool_timeout,
            tool.call(ctx, &invocation.input_text),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(tool = %invocation.tool_name, error = %e, "Tool execution failed");
                format!("Error: {e}")
            }
            Err(_) => {
                warn!(tool = %invocation.tool_name, "Tool execution timed out");
                format!(
                    "Error: tool timed out after {}s",
                    self.config.tool_timeout.as_secs()
                )
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        info!(
            tool = %invocation.tool_name,
            duration_ms,
            observation_len = observation.len(),
            "Tool execution finished"
        );
        self.event_handler
            .on_tool_done(invocation, &observation, duration_ms)
            .await;
        observation
    }

    fn system_prompt(&self) -> String {
        let instructions = render_tool_instructions(&self.tools);
        match (&self.config.system_prompt, instructions.is_empty()) {
            (Some(prompt), true) => prompt.clone(),
            (Some(prompt), false) => format!("{prompt}\n\n{instructions}"),
            (None, _) => instructions,
        }
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        if !self.config.native_tools {
            return Vec::new();
        }
        self.tools
            .iter()
            .map(|tool| ToolDefinition::text_input(tool.name(), tool.description(), tool.input_hint()))
            .collect()
    }

    fn build_request(
        &self,
        system: &str,
        definitions: &[ToolDefinition],
        conversation: &[Message],
    ) -> CompletionRequest {
        let mut builder = CompletionRequest::builder(&self.config.model)
            .messages(conversation.to_vec())
            .max_tokens(self.config.max_tokens)
            .tools(definitions.to_vec());
        if !system.is_empty() {
            builder = builder.system(system);
        }
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        if !self.tools.is_empty() && !self.config.native_tools {
            builder = builder.stop_sequences(vec![OBSERVATION_STOP.to_string()]);
        }
        builder.build()
    }
}

/// Builder for [`ReasoningAgentExecutor`]
pub struct ReasoningAgentExecutorBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    tools: Arc<ToolRegistry>,
    config: ExecutorConfig,
    event_handler: Option<Arc<dyn ExecutorEventHandler>>,
}

impl ReasoningAgentExecutorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: Arc::new(ToolRegistry::new()),
            config: ExecutorConfig::default(),
            event_handler: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    pub fn model_timeout(mut self, timeout: Duration) -> Self {
        self.config.model_timeout = timeout;
        self
    }

    pub fn event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn build(self) -> agent_core::Result<ReasoningAgentExecutor> {
        let provider = self.provider.ok_or_else(|| {
            agent_core::Error::InitializationFailed("Provider not set".to_string())
        })?;
        if self.config.max_iterations == 0 {
            return Err(agent_core::Error::InitializationFailed(
                "max_iterations must be greater than 0".to_string(),
            ));
        }
        let executor = ReasoningAgentExecutor::new(provider, self.tools, self.config);
        Ok(match self.event_handler {
            Some(handler) => executor.with_event_handler(handler),
            None => executor,
        })
    }
}

impl Default for ReasoningAgentExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::Result;
    use agent_llm::{CompletionResponse, ContentPart, Role, ScriptedProvider, StopReason, TokenUsage, ToolCall};
    use agent_tools::Tool;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingTool {
        name: &'static str,
        calls: AtomicUsize,
    }

    impl CountingTool {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "Latest quote"
        }
        async fn call(&self, _ctx: &Context, input: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("Stock: 贵州茅台 ({input}), Price: 1700.00"))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "OrderBook"
        }
        fn description(&self) -> &str {
            "Order book pressure"
        }
        async fn call(&self, _ctx: &Context, _input: &str) -> Result<String> {
            Err(agent_core::Error::ProcessingFailed("upstream 502".into()))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "Slow"
        }
        fn description(&self) -> &str {
            "Never answers in time"
        }
        async fn call(&self, _ctx: &Context, _input: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".into())
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExecutorEventHandler for Recorder {
        async fn on_tool_start(&self, invocation: &ToolInvocation) {
            self.events.lock().unwrap().push(format!("start:{}", invocation.tool_name));
        }
        async fn on_tool_done(&self, invocation: &ToolInvocation, _obs: &str, _ms: u64) {
            self.events.lock().unwrap().push(format!("done:{}", invocation.tool_name));
        }
        async fn on_complete(&self, outcome: &ExecutionOutcome, _transcript: &str) {
            self.events.lock().unwrap().push(format!("complete:{}", outcome.label()));
        }
    }

    fn executor(provider: Arc<ScriptedProvider>, tools: ToolRegistry) -> ReasoningAgentExecutor {
        ReasoningAgentExecutor::builder()
            .provider(provider)
            .tools(Arc::new(tools))
            .model("test-model")
            .system_prompt("You are an A-share trader.")
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.tool_timeout, Duration::from_secs(10));
        assert!(!config.native_tools);
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(ReasoningAgentExecutor::builder().build().is_err());
    }

    #[tokio::test]
    async fn test_direct_final_answer() {
        let provider = Arc::new(ScriptedProvider::new(["Thought: easy\nFinal Answer: 看涨"]));
        let report = executor(provider.clone(), ToolRegistry::new())
            .run(&Context::new(), "predict sh600519")
            .await;

        assert_eq!(report.outcome, ExecutionOutcome::Finished);
        assert_eq!(report.transcript, "看涨");
        assert_eq!(report.trace.len(), 1);
        assert_eq!(report.trace.invocations(), 0);

        let requests = provider.requests();
        assert_eq!(requests[0].system.as_deref(), Some("You are an A-share trader."));
        assert!(requests[0].stop_sequences.is_none());
    }

    #[tokio::test]
    async fn test_tool_then_answer_feeds_observation_back() {
        let quote = CountingTool::new("StockQuote");
        let provider = Arc::new(ScriptedProvider::new([
            "Thought: need price\nAction: StockQuote\nAction Input: sh600519",
            "Final Answer: 震荡\n---METADATA---\n{\"confidence\":0.6,\"news_summary\":\"n\"}",
        ]));
        let report = executor(provider.clone(), ToolRegistry::new().with(quote.clone()))
            .run(&Context::new(), "predict")
            .await;

        assert_eq!(report.outcome, ExecutionOutcome::Finished);
        assert!(report.transcript.starts_with("震荡"));
        assert_eq!(quote.calls.load(Ordering::SeqCst), 1);

        let step = &report.trace.steps()[0];
        assert_eq!(step.thought, "need price");
        assert_eq!(step.action.as_ref().unwrap().input_text, "sh600519");
        assert!(step.observation.as_ref().unwrap().contains("1700.00"));

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        let system = requests[0].system.as_deref().unwrap();
        assert!(system.contains("StockQuote: Latest quote"));
        assert_eq!(
            requests[0].stop_sequences.as_deref(),
            Some(&[OBSERVATION_STOP.to_string()][..])
        );
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert!(last.text().starts_with("Observation: Stock: 贵州茅台"));
    }

    #[tokio::test]
    async fn test_never_exceeds_iteration_budget() {
        let quote = CountingTool::new("StockQuote");
        let provider = Arc::new(ScriptedProvider::repeating(
            "Thought: again\nAction: StockQuote\nAction Input: sh600519",
        ));
        let report = executor(provider.clone(), ToolRegistry::new().with(quote.clone()))
            .run(&Context::new(), "predict")
            .await;

        assert_eq!(report.outcome, ExecutionOutcome::IterationExceeded);
        assert_eq!(quote.calls.load(Ordering::SeqCst), 5);
        assert_eq!(report.trace.invocations(), 5);
        assert_eq!(provider.call_count(), 5);
        assert!(report.transcript.contains("Action: StockQuote"));
    }

    #[tokio::test]
    async fn test_custom_budget() {
        let quote = CountingTool::new("StockQuote");
        let provider = Arc::new(ScriptedProvider::repeating(
            "Action: StockQuote\nAction Input: sz000001",
        ));
        let report = ReasoningAgentExecutor::builder()
            .provider(provider)
            .tools(Arc::new(ToolRegistry::new().with(quote.clone())))
            .max_iterations(2)
            .build()
            .unwrap()
            .run(&Context::new(), "x")
            .await;
        assert_eq!(report.outcome, ExecutionOutcome::IterationExceeded);
        assert_eq!(quote.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_observation() {
        let provider = Arc::new(ScriptedProvider::new([
            "Action: Telepathy\nAction Input: sh600519",
            "Final Answer: done",
        ]));
        let report = executor(provider, ToolRegistry::new().with(CountingTool::new("StockQuote")))
            .run(&Context::new(), "x")
            .await;

        assert_eq!(report.outcome, ExecutionOutcome::Finished);
        let observation = report.trace.steps()[0].observation.clone().unwrap();
        assert!(observation.contains("unknown tool"));
        assert!(observation.contains("StockQuote"));
    }

    #[tokio::test]
    async fn test_tool_error_is_an_observation() {
        let provider = Arc::new(ScriptedProvider::new([
            "Action: OrderBook\nAction Input: sh600519",
            "Final Answer: done",
        ]));
        let report = executor(provider, ToolRegistry::new().with(Arc::new(FailingTool)))
            .run(&Context::new(), "x")
            .await;

        let observation = report.trace.steps()[0].observation.clone().unwrap();
        assert!(observation.starts_with("Error: "));
        assert!(observation.contains("upstream 502"));
        assert_eq!(report.outcome, ExecutionOutcome::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_timeout_is_an_observation() {
        let provider = Arc::new(ScriptedProvider::new([
            "Action: Slow\nAction Input: x",
            "Final Answer: done",
        ]));
        let report = executor(provider, ToolRegistry::new().with(Arc::new(SlowTool)))
            .run(&Context::new(), "x")
            .await;

        let observation = report.trace.steps()[0].observation.clone().unwrap();
        assert_eq!(observation, "Error: tool timed out after 10s");
    }

    #[tokio::test]
    async fn test_malformed_output_is_final() {
        let provider = Arc::new(ScriptedProvider::new(["今日收盘看涨，置信度0.7"]));
        let report = executor(provider, ToolRegistry::new().with(CountingTool::new("StockQuote")))
            .run(&Context::new(), "x")
            .await;
        assert_eq!(report.outcome, ExecutionOutcome::Finished);
        assert_eq!(report.transcript, "今日收盘看涨，置信度0.7");
    }

    #[tokio::test]
    async fn test_model_failure_first_turn_yields_placeholder() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()).push_failure("503"));
        let report = executor(provider, ToolRegistry::new())
            .run(&Context::new(), "x")
            .await;
        assert!(matches!(report.outcome, ExecutionOutcome::ModelFailed(_)));
        assert!(report.transcript.starts_with("Analysis unavailable:"));
    }

    #[tokio::test]
    async fn test_model_failure_later_keeps_last_text() {
        let provider = Arc::new(
            ScriptedProvider::new(["Thought: look\nAction: StockQuote\nAction Input: sh600519"])
                .push_failure("reset"),
        );
        let report = executor(provider, ToolRegistry::new().with(CountingTool::new("StockQuote")))
            .run(&Context::new(), "x")
            .await;
        assert!(matches!(report.outcome, ExecutionOutcome::ModelFailed(_)));
        assert!(report.transcript.contains("Action: StockQuote"));
    }

    #[tokio::test]
    async fn test_rejected_credentials_end_as_model_rejected() {
        let quote = CountingTool::new("StockQuote");
        let provider = Arc::new(
            ScriptedProvider::new(Vec::<String>::new()).push_error(|| agent_llm::LLMError::AuthenticationFailed),
        );
        let report = executor(provider.clone(), ToolRegistry::new().with(quote.clone()))
            .run(&Context::new(), "x")
            .await;

        assert!(matches!(report.outcome, ExecutionOutcome::ModelRejected(_)));
        assert_eq!(report.outcome.label(), "model_rejected");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(quote.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_native_tool_call_round_trip() {
        let call = CompletionResponse {
            message: Message {
                role: Role::Assistant,
                parts: vec![ContentPart::ToolUse(ToolCall {
                    id: "call_1".into(),
                    name: "StockQuote".into(),
                    input: serde_json::json!({"input": "sh600519"}),
                })],
            },
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        };
        let provider = Arc::new(
            ScriptedProvider::new(Vec::<String>::new())
                .push_response(call)
                .push_response(CompletionResponse::text("Final Answer: ok")),
        );
        let mut config = ExecutorConfig {
            native_tools: true,
            ..ExecutorConfig::default()
        };
        config.model = "m".into();
        let quote = CountingTool::new("StockQuote");
        let report = ReasoningAgentExecutor::new(
            provider.clone(),
            Arc::new(ToolRegistry::new().with(quote.clone())),
            config,
        )
        .run(&Context::new(), "x")
        .await;

        assert_eq!(report.transcript, "ok");
        assert_eq!(quote.calls.load(Ordering::SeqCst), 1);
        let requests = provider.requests();
        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(1));
        let last = requests[1].messages.last().unwrap();
        assert!(matches!(
            &last.parts[0],
            ContentPart::ToolResult { tool_use_id, .. } if tool_use_id == "call_1"
        ));
    }

    #[tokio::test]
    async fn test_native_parallel_calls_keep_only_executed_one() {
        let call = |id: &str, input: &str| {
            ContentPart::ToolUse(ToolCall {
                id: id.into(),
                name: "StockQuote".into(),
                input: serde_json::json!({ "input": input }),
            })
        };
        let response = CompletionResponse {
            message: Message {
                role: Role::Assistant,
                parts: vec![
                    ContentPart::Text { text: "Checking both".into() },
                    call("call_1", "sh600519"),
                    call("call_2", "sz000001"),
                ],
            },
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        };
        let provider = Arc::new(
            ScriptedProvider::new(Vec::<String>::new())
                .push_response(response)
                .push_response(CompletionResponse::text("Final Answer: ok")),
        );
        let config = ExecutorConfig {
            model: "m".into(),
            native_tools: true,
            ..ExecutorConfig::default()
        };
        let quote = CountingTool::new("StockQuote");
        ReasoningAgentExecutor::new(
            provider.clone(),
            Arc::new(ToolRegistry::new().with(quote.clone())),
            config,
        )
        .run(&Context::new(), "x")
        .await;

        assert_eq!(quote.calls.load(Ordering::SeqCst), 1);
        let messages = &provider.requests()[1].messages;
        let assistant = &messages[messages.len() - 2];
        let calls: Vec<&str> = assistant
            .parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolUse(call) => Some(call.id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(calls, vec!["call_1"]);
        assert_eq!(assistant.text(), "Checking both");
    }

    #[tokio::test]
    async fn test_event_handler_sequence() {
        let recorder = Arc::new(Recorder::default());
        let provider = Arc::new(ScriptedProvider::new([
            "Action: StockQuote\nAction Input: sh600519",
            "Final Answer: ok",
        ]));
        executor(provider, ToolRegistry::new().with(CountingTool::new("StockQuote")))
            .with_event_handler(recorder.clone())
            .run(&Context::new(), "x")
            .await;

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["start:StockQuote", "done:StockQuote", "complete:finished"]
        );
    }
}
