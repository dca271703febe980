//! Agent runtime
//!
//! [`ReasoningAgentExecutor`] drives a bounded reason/act/observe loop over a
//! tool catalogue and always yields a transcript, even when the model
//! misbehaves or the iteration budget runs out. [`SingleShotAgent`] is the
//! one-call variant for requests that need no tools.

pub mod agents;
pub mod decision;
pub mod executor;
pub mod react;
pub mod trace;

pub use agents::{SingleShotAgent, SingleShotConfig};
pub use decision::{AgentDecision, Decoded, decode};
pub use executor::{
    ExecutionOutcome, ExecutionReport, ExecutorConfig, ExecutorEventHandler, NoOpEventHandler,
    ReasoningAgentExecutor, ReasoningAgentExecutorBuilder,
};
pub use trace::{AgentStep, AgentTrace, ToolInvocation};
