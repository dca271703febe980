//! EastMoney daily K-line client

use crate::error::{Result, StockError};
use crate::risk::{DailyBar, PriceHistorySource};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "http://push2his.eastmoney.com";
const SOURCE: &str = "EastMoney K-line";

/// Public K-line endpoint, daily bars, forward-adjusted
#[derive(Debug, Clone)]
pub struct EastMoneyKlineClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

impl EastMoneyKlineClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Point at another host (mirrors, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, secid: &str, limit: usize) -> String {
        // fields2: f51 date, f53 close, f56 volume, f59 change percent
        format!(
            "{}/api/qt/stock/kline/get?secid={secid}&fields1=f1&fields2=f51,f53,f56,f59&klt=101&fqt=1&end=20500101&lmt={limit}",
            self.base_url
        )
    }
}

impl Default for EastMoneyKlineClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceHistorySource for EastMoneyKlineClient {
    async fn daily_bars(&self, secid: &str, limit: usize) -> Result<Vec<DailyBar>> {
        let response = self
            .client
            .get(self.url(secid, limit))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StockError::Timeout {
                        source_name: SOURCE.to_string(),
                        secs: self.timeout.as_secs(),
                    }
                } else {
                    StockError::Network(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(StockError::upstream(SOURCE, format!("HTTP {}", response.status())));
        }

        let body: KlineResponse = response.json().await?;
        let bars = parse_klines(body)?;
        debug!(secid, bars = bars.len(), "K-line bars fetched");
        Ok(bars)
    }
}

fn parse_klines(body: KlineResponse) -> Result<Vec<DailyBar>> {
    let lines = body
        .data
        .map(|d| d.klines)
        .filter(|lines| !lines.is_empty())
        .ok_or_else(|| StockError::NoData("no kline data".to_string()))?;

    lines.iter().map(|line| parse_kline_line(line)).collect()
}

/// Parse `date,close,volume,pct`
fn parse_kline_line(line: &str) -> Result<DailyBar> {
    let malformed = || StockError::upstream(SOURCE, format!("malformed kline '{line}'"));
    let mut fields = line.split(',');
    let mut next = || fields.next().map(str::trim).ok_or_else(malformed);

    let date = NaiveDate::parse_from_str(next()?, "%Y-%m-%d").map_err(|_| malformed())?;
    let close = next()?.parse::<f64>().map_err(|_| malformed())?;
    let volume = next()?.parse::<f64>().map_err(|_| malformed())?;
    let change_pct = next()?.parse::<f64>().unwrap_or(0.0);

    Ok(DailyBar {
        date,
        close,
        volume,
        change_pct,
    })
}
