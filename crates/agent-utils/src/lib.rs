//! Shared utilities
//!
//! Logging setup, process-level configuration, and the small text helpers the
//! prompt and parsing layers share.

pub mod config;
pub mod logging;
pub mod text;

pub use config::{Config, LogFormat};
pub use logging::{init_tracing, init_tracing_with};
