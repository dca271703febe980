//! Data provider contract
//!
//! A provider wraps one upstream signal (quote, order book, chip
//! distribution, dragon-tiger history, sector ranks, notices, risk control)
//! and renders it as text. The pipeline never looks inside a provider's
//! error beyond formatting it into a placeholder.

mod registry;

pub use registry::{DossierScope, ProviderRegistry};

use crate::code::StockCode;
use crate::error::Result;
use agent_core::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One upstream data source
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Section name used in the dossier, e.g. `Order Book`
    fn name(&self) -> &str;

    /// What the data is; shown to the model when the provider is exposed as a tool
    fn description(&self) -> &str;

    /// Expected input when the model calls the provider directly
    fn input_hint(&self) -> &str {
        "stock code, e.g. sh600519"
    }

    /// Input used when the provider fills its dossier section
    fn dossier_input(&self, code: &StockCode) -> String {
        code.to_string()
    }

    /// Fetch and render the signal
    async fn fetch(&self, ctx: &Context, input: &str) -> Result<String>;
}

/// Outcome of one provider fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceResult {
    pub source_name: String,
    /// Payload on success, placeholder on failure
    pub payload_text: String,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub elapsed_ms: u64,
}

impl DataSourceResult {
    pub fn success(source_name: impl Into<String>, payload_text: String, elapsed_ms: u64) -> Self {
        Self {
            source_name: source_name.into(),
            payload_text,
            succeeded: true,
            error_detail: None,
            elapsed_ms,
        }
    }

    /// Failed fetch rendered as `"<Section>: Data Unavailable (<reason>)"`
    pub fn failure(source_name: impl Into<String>, reason: impl Into<String>, elapsed_ms: u64) -> Self {
        let source_name = source_name.into();
        let reason = reason.into();
        Self {
            payload_text: placeholder(&source_name, &reason),
            source_name,
            succeeded: false,
            error_detail: Some(reason),
            elapsed_ms,
        }
    }
}

/// Placeholder text for a section whose source failed
pub fn placeholder(section: &str, reason: &str) -> String {
    format!("{section}: Data Unavailable ({reason})")
}
