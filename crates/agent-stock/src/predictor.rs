//! Prediction service
//!
//! [`StockPredictor`] runs the whole pipeline for one request: aggregate the
//! dossier, render the prompt, drive the reasoning loop, parse the
//! transcript and hand the result to the sinks. The single-shot requests
//! (image recognition, market review, pre-market analysis) share its model
//! resolution and configuration.
//!
//! Only configuration-class failures are returned as errors: no resolvable
//! model, or an endpoint that rejects the configured key or model id.
//! Provider, transient model and parsing failures degrade the result instead.

use crate::aggregator::EvidenceAggregator;
use crate::code::StockCode;
use crate::config::StockConfig;
use crate::error::{Result, StockError};
use crate::market::{MarketAnalysis, MarketReview, MarketSnapshot};
use crate::parser::{
    PredictionResult, RecognizedStock, parse_market_analysis, parse_market_review, parse_prediction,
    parse_recognized_stocks,
};
use crate::phase::{MarketPhase, market_now};
use crate::prompts::{PREDICTION_SYSTEM_PROMPT, PromptBuilder};
use crate::provider::{DataSourceResult, DossierScope, ProviderRegistry};
use crate::seats::SeatTagger;
use crate::sink::PredictionSink;
use crate::tools::provider_tools;
use agent_core::Context;
use agent_llm::{ImageSource, Message, ModelSource, ResolvedModel};
use agent_runtime::{
    ExecutionOutcome, ExecutorConfig, ExecutorEventHandler, ReasoningAgentExecutor, SingleShotAgent,
    SingleShotConfig,
};
use agent_tools::ToolRegistry;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// How the reasoning loop ended, in serializable form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcomeKind {
    Finished,
    IterationExceeded,
    ModelFailed,
}

impl From<&ExecutionOutcome> for ExecutionOutcomeKind {
    fn from(outcome: &ExecutionOutcome) -> Self {
        match outcome {
            ExecutionOutcome::Finished => ExecutionOutcomeKind::Finished,
            ExecutionOutcome::IterationExceeded => ExecutionOutcomeKind::IterationExceeded,
            ExecutionOutcome::ModelFailed(_) | ExecutionOutcome::ModelRejected(_) => ExecutionOutcomeKind::ModelFailed,
        }
    }
}

/// One finished prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub code: String,
    pub phase: MarketPhase,
    pub generated_at: DateTime<FixedOffset>,
    pub result: PredictionResult,
    pub outcome: ExecutionOutcomeKind,
    /// Per-provider fetch outcomes
    pub ledger: Vec<DataSourceResult>,
    /// Reasoning steps taken
    pub steps: usize,
}

/// The prediction pipeline
pub struct StockPredictor {
    models: Arc<dyn ModelSource>,
    aggregator: EvidenceAggregator,
    tools: Arc<ToolRegistry>,
    prompts: PromptBuilder,
    config: StockConfig,
    seats: Arc<SeatTagger>,
    sinks: Vec<Arc<dyn PredictionSink>>,
    event_handler: Option<Arc<dyn ExecutorEventHandler>>,
}

impl StockPredictor {
    pub fn new(models: Arc<dyn ModelSource>, registry: Arc<ProviderRegistry>, config: StockConfig) -> Result<Self> {
        config.validate()?;
        let tools = Arc::new(provider_tools(&registry));
        let aggregator = EvidenceAggregator::new(registry, config.provider_timeout, config.max_section_chars);

        Ok(Self {
            models,
            aggregator,
            tools,
            prompts: PromptBuilder::new()?,
            config,
            seats: Arc::new(SeatTagger::default()),
            sinks: Vec::new(),
            event_handler: None,
        })
    }

    pub fn with_seat_tagger(mut self, seats: Arc<SeatTagger>) -> Self {
        self.seats = seats;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn PredictionSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Observe tool calls of every reasoning run
    pub fn with_event_handler(mut self, handler: Arc<dyn ExecutorEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn config(&self) -> &StockConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        self.aggregator.registry()
    }

    /// Predict `code` now, with the given model or the configured default
    pub async fn predict(&self, code: &str, model: Option<&str>) -> Result<Prediction> {
        self.predict_at(code, model, market_now()).await
    }

    /// Predict as of `generated_at`; the phase is derived from it
    #[instrument(skip_all, fields(code = %code, model = model.unwrap_or("default")))]
    pub async fn predict_at(
        &self,
        code: &str,
        model: Option<&str>,
        generated_at: DateTime<FixedOffset>,
    ) -> Result<Prediction> {
        let code = StockCode::parse(code)?;
        let resolved = self.resolve(model)?;
        let phase = MarketPhase::classify(generated_at.naive_local());

        let ctx = Context::for_request()
            .with_stock_code(code.to_string())
            .with_model(resolved.model.clone())
            .with_language(self.config.output_language.clone());

        let dossier = self
            .aggregator
            .build(&ctx, &code, &DossierScope::All, phase, generated_at)
            .await;
        let prompt = self.prompts.prediction(&dossier, &self.config.output_language)?;

        let mut executor = ReasoningAgentExecutor::new(
            resolved.provider,
            Arc::clone(&self.tools),
            self.executor_config(resolved.model),
        );
        if let Some(handler) = &self.event_handler {
            executor = executor.with_event_handler(Arc::clone(handler));
        }
        let report = executor.run(&ctx, prompt).await;
        if let ExecutionOutcome::ModelRejected(reason) = &report.outcome {
            return Err(StockError::ConfigurationMissing(reason.clone()));
        }

        let result = parse_prediction(&report.transcript);
        if !result.has_model_metadata() {
            warn!(code = %code, "Prediction metadata recovered with defaults");
        }

        let prediction = Prediction {
            code: code.to_string(),
            phase,
            generated_at,
            result,
            outcome: ExecutionOutcomeKind::from(&report.outcome),
            ledger: dossier.into_ledger(),
            steps: report.trace.len(),
        };
        info!(
            code = %prediction.code,
            outcome = report.outcome.label(),
            confidence = prediction.result.confidence,
            steps = prediction.steps,
            "Prediction finished"
        );

        self.publish(&prediction).await;
        Ok(prediction)
    }

    /// Stock mentions in an image; empty when nothing is found or the model fails
    #[instrument(skip(self, image), fields(bytes = image.len()))]
    pub async fn recognize_image(&self, image: &[u8], model: Option<&str>) -> Result<Vec<RecognizedStock>> {
        let agent = self.single_shot(model)?;
        let message = Message::user_with_image(self.prompts.recognition()?, ImageSource::from_bytes(image));

        match agent.complete(vec![message]).await {
            Ok(text) => {
                let stocks = parse_recognized_stocks(&text);
                info!(count = stocks.len(), "Image recognition finished");
                Ok(stocks)
            }
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Image recognition failed, returning no stocks");
                Ok(Vec::new())
            }
        }
    }

    /// Post-close review of a market snapshot
    #[instrument(skip(self, snapshot), fields(date = %snapshot.date))]
    pub async fn review_market(&self, snapshot: &MarketSnapshot, model: Option<&str>) -> Result<MarketReview> {
        let prompt = self
            .prompts
            .market_review(snapshot, &self.seats, &self.config.output_language)?;
        let text = self.complete_or_explain(model, prompt, "Market review").await?;
        Ok(parse_market_review(&text))
    }

    /// Pre-market outlook from the latest snapshot
    #[instrument(skip(self, snapshot), fields(date = %snapshot.date))]
    pub async fn analyze_market(&self, snapshot: &MarketSnapshot, model: Option<&str>) -> Result<MarketAnalysis> {
        let prompt = self
            .prompts
            .market_analysis(snapshot, &self.seats, &self.config.output_language)?;
        let text = self.complete_or_explain(model, prompt, "Market analysis").await?;
        Ok(parse_market_analysis(&text))
    }

    /// Reply text, or a one-line explanation when a non-fatal model error occurs
    async fn complete_or_explain(&self, model: Option<&str>, prompt: String, what: &str) -> Result<String> {
        let agent = self.single_shot(model)?;
        match agent.complete(vec![Message::user(prompt)]).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "{what} failed");
                Ok(format!("{what} unavailable: {e}"))
            }
        }
    }

    fn resolve(&self, model: Option<&str>) -> Result<ResolvedModel> {
        self.models
            .resolve(model)
            .map_err(|e| StockError::ConfigurationMissing(e.to_string()))
    }

    fn single_shot(&self, model: Option<&str>) -> Result<SingleShotAgent> {
        let resolved = self.resolve(model)?;
        Ok(SingleShotAgent::new(
            resolved.provider,
            SingleShotConfig {
                model: resolved.model,
                system_prompt: None,
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                timeout: self.config.model_timeout,
            },
        ))
    }

    fn executor_config(&self, model: String) -> ExecutorConfig {
        ExecutorConfig {
            model,
            system_prompt: Some(PREDICTION_SYSTEM_PROMPT.to_string()),
            max_iterations: self.config.max_iterations,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            model_timeout: self.config.model_timeout,
            tool_timeout: self.config.tool_timeout,
            native_tools: false,
        }
    }

    async fn publish(&self, prediction: &Prediction) {
        for sink in &self.sinks {
            if let Err(e) = sink.publish(&prediction.code, prediction).await {
                warn!(code = %prediction.code, error = %e, "Prediction sink failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DataProvider;
    use crate::sink::JsonLinesSink;
    use agent_llm::{FixedModel, LLMError, ScriptedProvider};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct Quote;

    #[async_trait]
    impl DataProvider for Quote {
        fn name(&self) -> &str {
            "Stock Quote"
        }
        fn description(&self) -> &str {
            "Latest price, change and volume"
        }
        async fn fetch(&self, _ctx: &Context, input: &str) -> Result<String> {
            Ok(format!("{input}: Price 1700.00, Change +1.20%"))
        }
    }

    struct Broken;

    #[async_trait]
    impl DataProvider for Broken {
        fn name(&self) -> &str {
            "Chip Distribution"
        }
        fn description(&self) -> &str {
            "Holder cost basis"
        }
        async fn fetch(&self, _ctx: &Context, _input: &str) -> Result<String> {
            Err(StockError::upstream("Chip Distribution", "empty body"))
        }
    }

    struct NoModels;

    impl ModelSource for NoModels {
        fn resolve(&self, _requested: Option<&str>) -> agent_llm::Result<ResolvedModel> {
            Err(LLMError::ConfigurationError("no model configuration loaded".into()))
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<(String, f64)>>);

    #[async_trait]
    impl PredictionSink for Collect {
        async fn publish(&self, code: &str, prediction: &Prediction) -> Result<()> {
            self.0
                .lock()
                .unwrap()
                .push((code.to_string(), prediction.result.confidence));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl PredictionSink for Failing {
        async fn publish(&self, _code: &str, _prediction: &Prediction) -> Result<()> {
            Err(StockError::Other("disk full".into()))
        }
    }

    fn registry() -> Arc<ProviderRegistry> {
        Arc::new(
            ProviderRegistry::new()
                .with(Arc::new(Quote))
                .with(Arc::new(Broken)),
        )
    }

    fn predictor(provider: Arc<ScriptedProvider>) -> StockPredictor {
        let models = Arc::new(FixedModel::new(provider, "deepseek-chat"));
        StockPredictor::new(models, registry(), StockConfig::default()).unwrap()
    }

    fn tuesday_at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 4, hour, minute, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_predict_end_to_end() {
        let provider = Arc::new(ScriptedProvider::new([
            "Thought: refresh the quote\nAction: StockQuote\nAction Input: sh600519",
            "Final Answer: 看涨，量价配合良好。\n---METADATA---\n{\"confidence\": 0.8, \"news_summary\": \"回购公告\"}",
        ]));
        let sink = Arc::new(Collect::default());
        let predictor = predictor(provider.clone()).with_sink(sink.clone());

        let prediction = predictor
            .predict_at("600519", None, tuesday_at(10, 30))
            .await
            .unwrap();

        assert_eq!(prediction.code, "sh600519");
        assert_eq!(prediction.phase, MarketPhase::Intraday);
        assert_eq!(prediction.outcome, ExecutionOutcomeKind::Finished);
        assert_eq!(prediction.result.analysis, "看涨，量价配合良好。");
        assert_eq!(prediction.result.confidence, 0.8);
        assert_eq!(prediction.result.news_summary, "回购公告");
        assert_eq!(prediction.steps, 2);
        assert_eq!(prediction.ledger.len(), 2);
        assert!(!prediction.ledger[1].succeeded);

        let requests = provider.requests();
        let prompt = requests[0].messages[0].text();
        assert!(prompt.contains("[Stock Quote]\nsh600519: Price 1700.00"));
        assert!(prompt.contains("Chip Distribution: Data Unavailable (empty body)"));
        assert_eq!(requests[0].model, "deepseek-chat");
        assert!(requests[0].system.as_deref().unwrap().contains("StockQuote: Latest price"));

        let second = requests[1].messages.last().unwrap().text();
        assert!(second.starts_with("Observation: sh600519: Price 1700.00"));

        assert_eq!(sink.0.lock().unwrap().as_slice(), &[("sh600519".to_string(), 0.8)]);
    }

    #[tokio::test]
    async fn test_malformed_metadata_degrades() {
        let provider = Arc::new(ScriptedProvider::new(["Final Answer: 震荡为主，无法给出明确方向。"]));
        let prediction = predictor(provider)
            .predict_at("sz000001", None, tuesday_at(20, 0))
            .await
            .unwrap();

        assert_eq!(prediction.phase, MarketPhase::PostMarket);
        assert_eq!(prediction.result.analysis, "震荡为主，无法给出明确方向。");
        assert_eq!(prediction.result.confidence, 0.5);
        assert!(!prediction.result.has_model_metadata());
    }

    #[tokio::test]
    async fn test_model_failure_degrades() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()).push_failure("HTTP 503"));
        let prediction = predictor(provider)
            .predict_at("sh600519", None, tuesday_at(8, 0))
            .await
            .unwrap();

        assert_eq!(prediction.phase, MarketPhase::PreMarket);
        assert_eq!(prediction.outcome, ExecutionOutcomeKind::ModelFailed);
        assert!(prediction.result.analysis.starts_with("Analysis unavailable:"));
        assert!(prediction.result.analysis.contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_iteration_budget_keeps_last_text() {
        let provider = Arc::new(ScriptedProvider::repeating(
            "Thought: again\nAction: StockQuote\nAction Input: sh600519",
        ));
        let prediction = predictor(provider.clone())
            .predict_at("sh600519", None, tuesday_at(11, 0))
            .await
            .unwrap();

        assert_eq!(prediction.outcome, ExecutionOutcomeKind::IterationExceeded);
        assert_eq!(provider.call_count(), 5);
        assert!(prediction.result.analysis.contains("Action: StockQuote"));
    }

    #[tokio::test]
    async fn test_missing_configuration_is_fatal() {
        let predictor = StockPredictor::new(Arc::new(NoModels), registry(), StockConfig::default()).unwrap();
        let err = predictor.predict("sh600519", None).await.unwrap_err();
        assert!(matches!(err, StockError::ConfigurationMissing(_)));
        assert!(err.is_fatal());

        let err = predictor.recognize_image(b"GIF89a", None).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_rejected_api_key_fails_request() {
        let provider = Arc::new(
            ScriptedProvider::new(Vec::<String>::new()).push_error(|| LLMError::AuthenticationFailed),
        );
        let sink = Arc::new(Collect::default());
        let err = predictor(provider)
            .with_sink(sink.clone())
            .predict_at("sh600519", None, tuesday_at(10, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, StockError::ConfigurationMissing(_)));
        assert!(err.to_string().contains("authentication failed"));
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_model_id_fails_recognition() {
        let provider = Arc::new(
            ScriptedProvider::new(Vec::<String>::new())
                .push_error(|| LLMError::ModelNotFound("glm-4v".into())),
        );
        let err = predictor(provider)
            .recognize_image(b"\x89PNG", Some("glm-4v"))
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::ConfigurationMissing(_)));
    }

    #[tokio::test]
    async fn test_invalid_code_is_rejected() {
        let provider = Arc::new(ScriptedProvider::repeating("Final Answer: x"));
        let err = predictor(provider.clone()).predict("AAPL", None).await.unwrap_err();
        assert!(matches!(err, StockError::InvalidCode(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_fail_prediction() {
        let provider = Arc::new(ScriptedProvider::new(["Final Answer: ok"]));
        let predictor = predictor(provider).with_sink(Arc::new(Failing));
        assert!(predictor.predict("sh600519", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_json_lines_sink() {
        let provider = Arc::new(ScriptedProvider::new(["Final Answer: ok"]));
        let sink = Arc::new(JsonLinesSink::new(Vec::new()));
        let predictor = predictor(provider).with_sink(sink.clone());
        predictor.predict_at("sh600519", None, tuesday_at(9, 15)).await.unwrap();
        drop(predictor);

        let bytes = Arc::try_unwrap(sink).ok().unwrap().into_inner();
        let line: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(line["code"], "sh600519");
        assert_eq!(line["phase"], "intraday");
        assert_eq!(line["outcome"], "finished");
        assert_eq!(line["result"]["metadata"], "fallback");
    }

    #[tokio::test]
    async fn test_recognize_image() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"[{"code": "600519", "name": "贵州茅台"}, {"code": "830001", "name": "北交所"}]"#,
        ]));
        let stocks = predictor(provider.clone())
            .recognize_image(&[0xFF, 0xD8, 0xFF, 0xE0], Some("glm-4v"))
            .await
            .unwrap();

        assert_eq!(
            stocks,
            vec![RecognizedStock {
                code: "sh600519".into(),
                name: "贵州茅台".into()
            }]
        );
        let request = &provider.requests()[0];
        assert!(request.messages[0].has_image());
        assert!(request.tools.is_none());
    }

    #[tokio::test]
    async fn test_recognize_image_model_failure_is_empty() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()).push_failure("timeout"));
        let stocks = predictor(provider).recognize_image(b"\x89PNG", None).await.unwrap();
        assert!(stocks.is_empty());
    }

    #[tokio::test]
    async fn test_review_and_analysis() {
        let provider = Arc::new(
            ScriptedProvider::new([
                "```json\n{\"summary\": \"普涨\", \"key_risks\": [\"量能不足\"]}\n```",
                "模型没有返回 JSON",
            ])
            .push_failure("HTTP 500"),
        );
        let predictor = predictor(provider);
        let snapshot = MarketSnapshot {
            date: "2025-03-03".into(),
            ..Default::default()
        };

        let review = predictor.review_market(&snapshot, None).await.unwrap();
        assert_eq!(review.summary, "普涨");
        assert_eq!(review.key_risks, vec!["量能不足"]);

        let analysis = predictor.analyze_market(&snapshot, None).await.unwrap();
        assert_eq!(analysis.analysis_summary, "模型没有返回 JSON");

        let review = predictor.review_market(&snapshot, None).await.unwrap();
        assert!(review.summary.starts_with("Market review unavailable:"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let config = StockConfig {
            max_iterations: 0,
            ..StockConfig::default()
        };
        let models = Arc::new(FixedModel::new(provider, "m"));
        assert!(StockPredictor::new(models, registry(), config).is_err());
    }
}
