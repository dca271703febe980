//! Core types shared by every crate in the workspace.
//!
//! A [`Context`] travels with one prediction request through data providers,
//! tools and the reasoning loop. [`Error`] is the common error currency at
//! crate boundaries.

pub mod context;
pub mod error;

pub use context::Context;
pub use error::{Error, Result};
