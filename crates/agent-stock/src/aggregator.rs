//! Evidence aggregation
//!
//! Providers are fetched one after another in registry order, each under
//! its own deadline. A failed or timed-out provider leaves a placeholder in
//! its section; aggregation itself cannot fail.

use crate::code::StockCode;
use crate::phase::MarketPhase;
use crate::provider::{DataSourceResult, DossierScope, ProviderRegistry};
use agent_core::Context;
use agent_utils::text::truncate_chars;
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, instrument, warn};

/// Ordered sections of evidence for one prediction request
#[derive(Debug, Clone)]
pub struct Dossier {
    code: StockCode,
    phase: MarketPhase,
    generated_at: DateTime<FixedOffset>,
    sections: Vec<(String, String)>,
    ledger: Vec<DataSourceResult>,
}

impl Dossier {
    pub fn new(code: StockCode, phase: MarketPhase, generated_at: DateTime<FixedOffset>) -> Self {
        Self {
            code,
            phase,
            generated_at,
            sections: Vec::new(),
            ledger: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, result: DataSourceResult, body: String) {
        self.sections.push((result.source_name.clone(), body));
        self.ledger.push(result);
    }

    pub fn code(&self) -> &StockCode {
        &self.code
    }

    pub fn phase(&self) -> MarketPhase {
        self.phase
    }

    pub fn generated_at(&self) -> DateTime<FixedOffset> {
        self.generated_at
    }

    /// Sections in presentation order
    pub fn sections(&self) -> &[(String, String)] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(section, _)| section == name)
            .map(|(_, body)| body.as_str())
    }

    /// Per-provider outcomes, in fetch order
    pub fn ledger(&self) -> &[DataSourceResult] {
        &self.ledger
    }

    pub fn into_ledger(self) -> Vec<DataSourceResult> {
        self.ledger
    }

    pub fn succeeded(&self) -> usize {
        self.ledger.iter().filter(|r| r.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.ledger.len() - self.succeeded()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Builds dossiers from a provider registry
pub struct EvidenceAggregator {
    registry: Arc<ProviderRegistry>,
    provider_timeout: Duration,
    max_section_chars: usize,
}

impl EvidenceAggregator {
    pub fn new(registry: Arc<ProviderRegistry>, provider_timeout: Duration, max_section_chars: usize) -> Self {
        Self {
            registry,
            provider_timeout,
            max_section_chars,
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Fetch every provider in scope and assemble the dossier
    #[instrument(skip_all, fields(code = %code, phase = ?phase))]
    pub async fn build(
        &self,
        ctx: &Context,
        code: &StockCode,
        scope: &DossierScope,
        phase: MarketPhase,
        generated_at: DateTime<FixedOffset>,
    ) -> Dossier {
        let mut dossier = Dossier::new(code.clone(), phase, generated_at);

        for provider in self.registry.select(scope) {
            let name = provider.name();
            let input = provider.dossier_input(code);
            let started = Instant::now();
            let outcome = timeout(self.provider_timeout, provider.fetch(ctx, &input)).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let result = match outcome {
                Ok(Ok(payload)) => {
                    info!(provider = %name, elapsed_ms, "Provider fetch succeeded");
                    DataSourceResult::success(name, payload, elapsed_ms)
                }
                Ok(Err(e)) => {
                    warn!(provider = %name, elapsed_ms, error = %e, "Provider fetch failed");
                    DataSourceResult::failure(name, e.reason(), elapsed_ms)
                }
                Err(_) => {
                    warn!(provider = %name, elapsed_ms, "Provider fetch timed out");
                    DataSourceResult::failure(
                        name,
                        format!("timed out after {}s", self.provider_timeout.as_secs()),
                        elapsed_ms,
                    )
                }
            };

            let body = truncate_chars(&result.payload_text, self.max_section_chars);
            dossier.record(result, body);
        }

        info!(
            sections = dossier.sections().len(),
            succeeded = dossier.succeeded(),
            failed = dossier.failed(),
            "Dossier assembled"
        );
        dossier
    }
}
