//! Agents that do not need the tool loop

pub mod single_shot;

pub use single_shot::{SingleShotAgent, SingleShotConfig};
