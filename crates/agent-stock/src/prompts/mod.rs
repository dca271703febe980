//! Model-facing prompts
//!
//! Templates are MiniJinja sources compiled into the binary and registered
//! once in a shared [`Environment`]. Rendering only reads the environment, so
//! one [`PromptBuilder`] serves concurrent requests.

use crate::aggregator::Dossier;
use crate::error::Result;
use crate::market::MarketSnapshot;
use crate::parser::METADATA_SEPARATOR;
use crate::seats::SeatTagger;
use minijinja::{Environment, context};
use serde::Serialize;

const PREDICTION: &str = "prediction";
const RECOGNITION: &str = "recognition";
const MARKET_DATA: &str = "market_data";
const REVIEW: &str = "review";
const ANALYSIS: &str = "analysis";

/// Framing for the reasoning loop; the tool catalogue is appended after it
pub const PREDICTION_SYSTEM_PROMPT: &str = "You are an expert A-share Trader AI (Professional Fund Manager level). \
The user message already contains the collected evidence. Call a tool only to refresh or fill in a section that is \
missing or marked \"Data Unavailable\", then give your Final Answer.";

#[derive(Serialize)]
struct Section<'a> {
    name: &'a str,
    body: &'a str,
}

/// Renders every prompt the predictor sends
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(PREDICTION, include_str!("templates/prediction.j2"))?;
        env.add_template(RECOGNITION, include_str!("templates/recognition.j2"))?;
        env.add_template(MARKET_DATA, include_str!("templates/market_data.j2"))?;
        env.add_template(REVIEW, include_str!("templates/review.j2"))?;
        env.add_template(ANALYSIS, include_str!("templates/analysis.j2"))?;
        Ok(Self { env })
    }

    /// User prompt for one prediction: evidence sections, phase framing, output contract
    pub fn prediction(&self, dossier: &Dossier, language: &str) -> Result<String> {
        let sections: Vec<Section<'_>> = dossier
            .sections()
            .iter()
            .map(|(name, body)| Section { name, body })
            .collect();
        let phase = dossier.phase();

        let rendered = self.env.get_template(PREDICTION)?.render(context! {
            code => dossier.code().to_string(),
            board => dossier.code().board().display_name(),
            generated_at => dossier.generated_at().format("%Y-%m-%d %H:%M:%S").to_string(),
            phase_label => phase.label(),
            live => phase.is_live(),
            time_context => phase.time_context(),
            prediction_focus => phase.prediction_focus(),
            sections => sections,
            language => language,
            separator => METADATA_SEPARATOR,
        })?;
        Ok(rendered)
    }

    pub fn recognition(&self) -> Result<String> {
        Ok(self.env.get_template(RECOGNITION)?.render(context! {})?)
    }

    /// Post-close review of one snapshot
    pub fn market_review(&self, snapshot: &MarketSnapshot, tagger: &SeatTagger, language: &str) -> Result<String> {
        self.render_market(REVIEW, snapshot, tagger, language)
    }

    /// Pre-market outlook from the latest snapshot
    pub fn market_analysis(&self, snapshot: &MarketSnapshot, tagger: &SeatTagger, language: &str) -> Result<String> {
        self.render_market(ANALYSIS, snapshot, tagger, language)
    }

    fn render_market(
        &self,
        template: &str,
        snapshot: &MarketSnapshot,
        tagger: &SeatTagger,
        language: &str,
    ) -> Result<String> {
        let rendered = self.env.get_template(template)?.render(context! {
            date => snapshot.date.as_str(),
            sectors => snapshot.sector_summary(),
            limit_ups => snapshot.limit_up_summary(),
            dragon_tiger => snapshot.dragon_tiger_summary(tagger),
            language => language,
        })?;
        Ok(rendered)
    }
}
