//! Structured output parsing
//!
//! Model output is semi-structured text. Every parser here returns a value,
//! never an error: when the structured part cannot be recovered the richer
//! fields fall back to defaults and the raw text is kept.

use crate::code::normalize_code;
use crate::market::{MarketAnalysis, MarketReview};
use agent_utils::text::strip_code_fence;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Separator between the narrative and the metadata object
pub const METADATA_SEPARATOR: &str = "---METADATA---";

/// Confidence used when the model's metadata cannot be read
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

pub const FALLBACK_NEWS_SUMMARY: &str = "See analysis for details";

/// Name given to recognized stocks the model did not name
pub const UNKNOWN_NAME: &str = "Unknown";

// Letters glued to a digit run; anything but an optional sh/sz plus six digits fails to parse
static CODE_TOKEN_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)[a-z]*\d+").ok());

/// Where the confidence and news summary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    /// Parsed from the model's metadata block
    Model,
    /// Defaults; the confidence carries no signal
    Fallback,
}

/// Narrative prediction plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub analysis: String,
    /// In `[0, 1]`
    pub confidence: f64,
    pub news_summary: String,
    pub metadata: MetadataSource,
}

impl PredictionResult {
    /// Result with default metadata around the given analysis text
    pub fn fallback(analysis: impl Into<String>) -> Self {
        Self {
            analysis: analysis.into(),
            confidence: FALLBACK_CONFIDENCE,
            news_summary: FALLBACK_NEWS_SUMMARY.to_string(),
            metadata: MetadataSource::Fallback,
        }
    }

    /// Whether the confidence came from the model rather than the default
    pub fn has_model_metadata(&self) -> bool {
        self.metadata == MetadataSource::Model
    }
}

#[derive(Debug, Deserialize)]
struct Metadata {
    confidence: f64,
    news_summary: String,
}

/// Split a transcript into analysis and metadata
///
/// ```
/// use agent_stock::parser::parse_prediction;
///
/// let result = parse_prediction(r#"Up tomorrow---METADATA---{"confidence":0.85,"news_summary":"Y"}"#);
/// assert_eq!(result.analysis, "Up tomorrow");
/// assert_eq!(result.confidence, 0.85);
/// ```
pub fn parse_prediction(raw: &str) -> PredictionResult {
    let parts: Vec<&str> = raw.split(METADATA_SEPARATOR).collect();
    let [analysis, metadata] = parts.as_slice() else {
        debug!(parts = parts.len(), "No single metadata separator, using fallback metadata");
        return PredictionResult::fallback(raw.trim());
    };

    match serde_json::from_str::<Metadata>(strip_code_fence(metadata)) {
        Ok(meta) if meta.confidence.is_finite() => PredictionResult {
            analysis: analysis.trim().to_string(),
            confidence: meta.confidence.clamp(0.0, 1.0),
            news_summary: meta.news_summary,
            metadata: MetadataSource::Model,
        },
        Ok(_) => {
            warn!("Metadata confidence is not a number, using fallback metadata");
            PredictionResult::fallback(raw.trim())
        }
        Err(e) => {
            warn!(error = %e, "Metadata block is malformed, using fallback metadata");
            PredictionResult::fallback(raw.trim())
        }
    }
}

/// A stock mention extracted from an image or free text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedStock {
    /// Exchange-prefixed code, e.g. `sh600519`
    pub code: String,
    pub name: String,
}

/// One strategy for pulling stock mentions out of model text
///
/// `None` means the strategy does not apply and the next one is tried.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, text: &str) -> Option<Vec<RecognizedStock>>;
}

/// Strict `[{"code": ..., "name": ...}]` parse
pub struct JsonArrayExtractor;

#[derive(Deserialize)]
struct RawMention {
    #[serde(default)]
    code: String,
    #[serde(default)]
    name: String,
}

impl Extractor for JsonArrayExtractor {
    fn name(&self) -> &'static str {
        "json_array"
    }

    fn extract(&self, text: &str) -> Option<Vec<RecognizedStock>> {
        let mentions: Vec<RawMention> = serde_json::from_str(strip_code_fence(text)).ok()?;
        let stocks = mentions.into_iter().filter_map(|m| {
            let code = normalize_code(&m.code)?;
            let name = m.name.trim();
            Some(RecognizedStock {
                code,
                name: if name.is_empty() { UNKNOWN_NAME.to_string() } else { name.to_string() },
            })
        });
        Some(dedupe(stocks))
    }
}

/// Scan for prefixed or bare six-digit tokens
pub struct CodeScanExtractor;

impl Extractor for CodeScanExtractor {
    fn name(&self) -> &'static str {
        "code_scan"
    }

    fn extract(&self, text: &str) -> Option<Vec<RecognizedStock>> {
        let re = CODE_TOKEN_RE.as_ref()?;
        let stocks = re.find_iter(text).filter_map(|m| {
            normalize_code(m.as_str()).map(|code| RecognizedStock {
                code,
                name: UNKNOWN_NAME.to_string(),
            })
        });
        Some(dedupe(stocks))
    }
}

fn dedupe(stocks: impl Iterator<Item = RecognizedStock>) -> Vec<RecognizedStock> {
    let mut seen = HashSet::new();
    stocks.filter(|s| seen.insert(s.code.clone())).collect()
}

/// First strategy that applies wins
pub fn first_match(extractors: &[&dyn Extractor], text: &str) -> Option<Vec<RecognizedStock>> {
    extractors.iter().find_map(|extractor| {
        let found = extractor.extract(text)?;
        debug!(extractor = extractor.name(), count = found.len(), "Stock mentions extracted");
        Some(found)
    })
}

/// Extract recognized stocks, de-duplicated in first-seen order
///
/// An empty list is a normal outcome.
pub fn parse_recognized_stocks(text: &str) -> Vec<RecognizedStock> {
    first_match(&[&JsonArrayExtractor, &CodeScanExtractor], text).unwrap_or_default()
}

/// Parse a market review, keeping the whole text as the summary on failure
pub fn parse_market_review(raw: &str) -> MarketReview {
    serde_json::from_str(strip_code_fence(raw)).unwrap_or_else(|e| {
        warn!(error = %e, "Market review is not JSON, keeping raw text");
        MarketReview {
            summary: raw.trim().to_string(),
            ..Default::default()
        }
    })
}

/// Parse a pre-market analysis, keeping the whole text as the summary on failure
pub fn parse_market_analysis(raw: &str) -> MarketAnalysis {
    serde_json::from_str(strip_code_fence(raw)).unwrap_or_else(|e| {
        warn!(error = %e, "Market analysis is not JSON, keeping raw text");
        MarketAnalysis {
            analysis_summary: raw.trim().to_string(),
            ..Default::default()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(stocks: &[RecognizedStock]) -> Vec<&str> {
        stocks.iter().map(|s| s.code.as_str()).collect()
    }

    #[test]
    fn test_prediction_with_metadata() {
        let result = parse_prediction(r#"X---METADATA---{"confidence":0.85,"news_summary":"Y"}"#);
        assert_eq!(result.analysis, "X");
        assert_eq!(result.confidence, 0.85);
        assert_eq!(result.news_summary, "Y");
        assert!(result.has_model_metadata());
    }

    #[test]
    fn test_prediction_without_separator() {
        let result = parse_prediction("plain text with no separator");
        assert_eq!(result.analysis, "plain text with no separator");
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.news_summary, "See analysis for details");
        assert_eq!(result.metadata, MetadataSource::Fallback);
    }

    #[test]
    fn test_prediction_fenced_metadata() {
        let raw = "Bullish.\n---METADATA---\n```json\n{\"confidence\": 0.7, \"news_summary\": \"Buyback\"}\n```";
        let result = parse_prediction(raw);
        assert_eq!(result.analysis, "Bullish.");
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.news_summary, "Buyback");
    }

    #[test]
    fn test_prediction_malformed_metadata_keeps_raw() {
        let raw = "Bearish---METADATA---{confidence: high}";
        let result = parse_prediction(raw);
        assert_eq!(result.analysis, raw);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
        assert!(!result.has_model_metadata());
    }

    #[test]
    fn test_prediction_missing_field_is_fallback() {
        let result = parse_prediction(r#"A---METADATA---{"confidence":0.9}"#);
        assert_eq!(result.metadata, MetadataSource::Fallback);
        assert_eq!(result.news_summary, FALLBACK_NEWS_SUMMARY);
    }

    #[test]
    fn test_prediction_two_separators_is_fallback() {
        let raw = r#"A---METADATA---B---METADATA---{"confidence":0.9,"news_summary":"n"}"#;
        let result = parse_prediction(raw);
        assert_eq!(result.analysis, raw);
        assert_eq!(result.metadata, MetadataSource::Fallback);
    }

    #[test]
    fn test_prediction_confidence_clamped() {
        let result = parse_prediction(r#"A---METADATA---{"confidence":3.0,"news_summary":"n"}"#);
        assert_eq!(result.confidence, 1.0);
        let result = parse_prediction(r#"A---METADATA---{"confidence":-1,"news_summary":"n"}"#);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_recognition_json_array() {
        let stocks = parse_recognized_stocks(
            r#"```json
[{"code": "600519", "name": "贵州茅台"}, {"code": "SZ000001", "name": ""}, {"code": "830001", "name": "北交所"}, {"code": "sh600519", "name": "dup"}]
```"#,
        );
        assert_eq!(
            stocks,
            vec![
                RecognizedStock {
                    code: "sh600519".into(),
                    name: "贵州茅台".into()
                },
                RecognizedStock {
                    code: "sz000001".into(),
                    name: "Unknown".into()
                },
            ]
        );
    }

    #[test]
    fn test_recognition_empty_array_is_valid() {
        assert!(parse_recognized_stocks("[]").is_empty());
    }

    #[test]
    fn test_recognition_scan_fallback() {
        let stocks = parse_recognized_stocks("sh600519 and 000001 and not-a-code");
        assert_eq!(codes(&stocks), vec!["sh600519", "sz000001"]);
    }

    #[test]
    fn test_recognition_scan_dedupes_and_drops_unprefixable() {
        let stocks = parse_recognized_stocks("600519, SH600519, 830001, 300750.SZ, 1234567, 茅台600036");
        assert_eq!(codes(&stocks), vec!["sh600519", "sz300750", "sh600036"]);
    }

    #[test]
    fn test_recognition_nothing_found() {
        assert!(parse_recognized_stocks("图片中没有股票").is_empty());
    }

    #[test]
    fn test_first_match_order() {
        struct Never;
        impl Extractor for Never {
            fn name(&self) -> &'static str {
                "never"
            }
            fn extract(&self, _text: &str) -> Option<Vec<RecognizedStock>> {
                None
            }
        }

        let found = first_match(&[&Never, &CodeScanExtractor], "600036");
        assert_eq!(found.map(|s| s.len()), Some(1));
        assert!(first_match(&[&Never], "600036").is_none());
    }

    #[test]
    fn test_market_review_json() {
        let review = parse_market_review(
            r#"{"summary": "缩量震荡", "sector_analysis": "算力领涨", "sentiment_analysis": "情绪回暖", "key_risks": ["高位股分歧"], "opportunities": ["低空经济"]}"#,
        );
        assert_eq!(review.summary, "缩量震荡");
        assert_eq!(review.key_risks, vec!["高位股分歧"]);
    }

    #[test]
    fn test_market_review_fallback() {
        let review = parse_market_review("今天市场整体偏弱。");
        assert_eq!(review.summary, "今天市场整体偏弱。");
        assert!(review.key_risks.is_empty());
    }

    #[test]
    fn test_market_analysis_fallback() {
        let analysis = parse_market_analysis("```\nnot json\n```");
        assert_eq!(analysis.analysis_summary, "```\nnot json\n```");
        let analysis = parse_market_analysis(r#"{"hot_stocks": ["中际旭创"], "analysis_summary": "关注算力"}"#);
        assert_eq!(analysis.hot_stocks, vec!["中际旭创"]);
        assert_eq!(analysis.analysis_summary, "关注算力");
    }
}
