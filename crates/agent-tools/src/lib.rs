//! Tools the reasoning loop can invoke
//!
//! A tool takes one line of free text and returns an observation string. The
//! catalogue is assembled once at startup and shared read-only afterwards.

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::Tool;
