//! A-share prediction pipeline
//!
//! Builds an evidence dossier from independent, individually fallible data
//! providers, drives a bounded tool-using reasoning loop over it, and parses
//! the transcript into a prediction with machine-readable metadata. A
//! deterministic risk-control check against the board benchmark is one of
//! the providers.
//!
//! # Architecture
//!
//! ```text
//! EvidenceAggregator -> PromptBuilder -> ReasoningAgentExecutor -> parse_prediction -> Prediction
//!        ^                                        |
//!   ProviderRegistry  <---- ProviderTool ---------+
//! ```
//!
//! - [`provider`]: the [`DataProvider`] contract and the ordered registry
//! - [`aggregator`]: [`EvidenceAggregator`] and the [`Dossier`] it builds
//! - [`prompts`]: MiniJinja templates for every model request
//! - [`parser`]: metadata splitting and stock-mention extraction
//! - [`risk`]: [`RiskControlEngine`] and its provider wrapper
//! - [`predictor`]: [`StockPredictor`], the request-level service
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_llm::FixedModel;
//! use agent_stock::{EastMoneyKlineClient, ProviderRegistry, RiskControlProvider, StockConfig, StockPredictor};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StockConfig::default();
//!     let history = Arc::new(EastMoneyKlineClient::new());
//!     let registry = ProviderRegistry::new().with(Arc::new(RiskControlProvider::new(
//!         history,
//!         config.stock_days,
//!         config.benchmark_days,
//!     )));
//!
//!     let models = Arc::new(FixedModel::new(/* your provider */, "deepseek-chat"));
//!     let predictor = StockPredictor::new(models, Arc::new(registry), config)?;
//!
//!     let prediction = predictor.predict("sh600519", None).await?;
//!     println!("{}", prediction.result.analysis);
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod code;
pub mod config;
pub mod eastmoney;
pub mod error;
pub mod market;
pub mod parser;
pub mod phase;
pub mod predictor;
pub mod prompts;
pub mod provider;
pub mod risk;
pub mod seats;
pub mod sink;
pub mod tools;

pub use aggregator::{Dossier, EvidenceAggregator};
pub use code::{Board, Exchange, StockCode, normalize_code};
pub use config::{StockConfig, StockConfigBuilder};
pub use eastmoney::EastMoneyKlineClient;
pub use error::{Result, StockError};
pub use market::{MarketAnalysis, MarketReview, MarketSnapshot};
pub use parser::{MetadataSource, PredictionResult, RecognizedStock, parse_prediction, parse_recognized_stocks};
pub use phase::{MarketPhase, market_now};
pub use predictor::{ExecutionOutcomeKind, Prediction, StockPredictor};
pub use prompts::PromptBuilder;
pub use provider::{DataProvider, DataSourceResult, DossierScope, ProviderRegistry};
pub use risk::{DailyBar, PriceHistorySource, RiskControlEngine, RiskControlProvider, RiskFinding};
pub use seats::SeatTagger;
pub use sink::{JsonLinesSink, PredictionSink};
pub use tools::{ProviderTool, provider_tools};
