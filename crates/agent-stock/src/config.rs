//! Configuration for the prediction pipeline

use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pipeline configuration
///
/// Read-only after construction and shared between concurrent requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    /// Deadline for each data provider fetch
    pub provider_timeout: Duration,

    /// Deadline for each model round-trip
    pub model_timeout: Duration,

    /// Deadline for each tool call inside the agent loop
    pub tool_timeout: Duration,

    /// Model turns per prediction
    pub max_iterations: usize,

    /// Upper bound on the characters kept per dossier section
    pub max_section_chars: usize,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Temperature for sampling
    pub temperature: Option<f32>,

    /// Language the final analysis must be written in
    pub output_language: String,

    /// Bars requested for the board benchmark
    pub benchmark_days: usize,

    /// Bars requested for the stock itself
    pub stock_days: usize,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(10),
            model_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(10),
            max_iterations: 5,
            max_section_chars: 4000,
            max_tokens: 4096,
            temperature: Some(0.3),
            output_language: "Chinese".to_string(),
            benchmark_days: 60,
            stock_days: 40,
        }
    }
}

impl StockConfig {
    /// Create a new configuration builder
    pub fn builder() -> StockConfigBuilder {
        StockConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(StockError::Other(
                "max_iterations must be greater than 0".to_string(),
            ));
        }

        if self.provider_timeout.is_zero() || self.model_timeout.is_zero() || self.tool_timeout.is_zero() {
            return Err(StockError::Other("timeouts must be non-zero".to_string()));
        }

        // 30 trading days back needs 31 bars, and the benchmark must reach at least as far
        if self.stock_days <= 30 {
            return Err(StockError::Other(
                "stock_days must cover the 30-day risk window".to_string(),
            ));
        }
        if self.benchmark_days < self.stock_days {
            return Err(StockError::Other(
                "benchmark_days must be at least stock_days".to_string(),
            ));
        }

        if self.max_section_chars == 0 {
            return Err(StockError::Other(
                "max_section_chars must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for StockConfig
#[derive(Debug, Default)]
pub struct StockConfigBuilder {
    provider_timeout: Option<Duration>,
    model_timeout: Option<Duration>,
    tool_timeout: Option<Duration>,
    max_iterations: Option<usize>,
    max_section_chars: Option<usize>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
    output_language: Option<String>,
    benchmark_days: Option<usize>,
    stock_days: Option<usize>,
}

impl StockConfigBuilder {
    pub fn provider_timeout(mut self, duration: Duration) -> Self {
        self.provider_timeout = Some(duration);
        self
    }

    pub fn model_timeout(mut self, duration: Duration) -> Self {
        self.model_timeout = Some(duration);
        self
    }

    pub fn tool_timeout(mut self, duration: Duration) -> Self {
        self.tool_timeout = Some(duration);
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn max_section_chars(mut self, max: usize) -> Self {
        self.max_section_chars = Some(max);
        self
    }

    pub fn max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn output_language(mut self, language: impl Into<String>) -> Self {
        self.output_language = Some(language.into());
        self
    }

    pub fn benchmark_days(mut self, days: usize) -> Self {
        self.benchmark_days = Some(days);
        self
    }

    pub fn stock_days(mut self, days: usize) -> Self {
        self.stock_days = Some(days);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<StockConfig> {
        let defaults = StockConfig::default();

        let config = StockConfig {
            provider_timeout: self.provider_timeout.unwrap_or(defaults.provider_timeout),
            model_timeout: self.model_timeout.unwrap_or(defaults.model_timeout),
            tool_timeout: self.tool_timeout.unwrap_or(defaults.tool_timeout),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            max_section_chars: self.max_section_chars.unwrap_or(defaults.max_section_chars),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.or(defaults.temperature),
            output_language: self.output_language.unwrap_or(defaults.output_language),
            benchmark_days: self.benchmark_days.unwrap_or(defaults.benchmark_days),
            stock_days: self.stock_days.unwrap_or(defaults.stock_days),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StockConfig::default();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.provider_timeout, Duration::from_secs(10));
        assert_eq!(config.output_language, "Chinese");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = StockConfig::builder()
            .max_iterations(3)
            .tool_timeout(Duration::from_secs(5))
            .output_language("English")
            .build()
            .unwrap();

        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.tool_timeout, Duration::from_secs(5));
        assert_eq!(config.output_language, "English");
        assert_eq!(config.benchmark_days, 60);
    }

    #[test]
    fn test_validation_rejects_zero_iterations() {
        assert!(StockConfig::builder().max_iterations(0).build().is_err());
    }

    #[test]
    fn test_validation_rejects_short_history() {
        assert!(StockConfig::builder().stock_days(20).build().is_err());
        assert!(
            StockConfig::builder()
                .stock_days(40)
                .benchmark_days(30)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let config: StockConfig =
            serde_json::from_str(r#"{"max_iterations": 4, "output_language": "English"}"#).unwrap();
        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.stock_days, 40);
    }
}
