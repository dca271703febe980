//! Trading-session phase classification
//!
//! Weekdays are split at 09:15 and 15:00 market time (UTC+8), both
//! inclusive in the intraday window. Weekends are always post-market. No
//! holiday calendar is consulted, so a weekday holiday classifies like a
//! normal trading day.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

const OPEN_MINUTE: u32 = 9 * 60 + 15;
const CLOSE_MINUTE: u32 = 15 * 60;
const MARKET_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Trading-session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPhase {
    /// Weekday before 09:15; framed like a closed market
    PreMarket,
    /// Weekday 09:15 to 15:00 inclusive
    Intraday,
    /// Weekday after 15:00, or any time at the weekend
    PostMarket,
}

impl MarketPhase {
    /// Classify a market-local timestamp
    pub fn classify(t: NaiveDateTime) -> Self {
        if matches!(t.weekday(), Weekday::Sat | Weekday::Sun) {
            return MarketPhase::PostMarket;
        }
        let minute = t.hour() * 60 + t.minute();
        if minute < OPEN_MINUTE {
            MarketPhase::PreMarket
        } else if minute <= CLOSE_MINUTE {
            MarketPhase::Intraday
        } else {
            MarketPhase::PostMarket
        }
    }

    /// Classify the current moment
    pub fn now() -> Self {
        Self::classify(market_now().naive_local())
    }

    /// Live order-book data is only meaningful intraday
    pub fn is_live(self) -> bool {
        self == MarketPhase::Intraday
    }

    /// Prompt label; pre-market shares the closed-market framing
    pub fn label(self) -> &'static str {
        match self {
            MarketPhase::Intraday => "盘中交易 (9:15-15:00)",
            MarketPhase::PreMarket | MarketPhase::PostMarket => "已收盘",
        }
    }

    /// Horizon the prediction has to cover
    pub fn prediction_focus(self) -> &'static str {
        match self {
            MarketPhase::Intraday => "当日收盘及未来3日预测",
            MarketPhase::PreMarket | MarketPhase::PostMarket => "次日及未来3日预测",
        }
    }

    /// Instructions telling the model how to weigh live versus settled data
    pub fn time_context(self) -> &'static str {
        match self {
            MarketPhase::Intraday => {
                "- Current Status: Intraday Trading (Live Market)\n\
                 - Focus: Analyze real-time Order Book pressure (Total Buy/Sell), WeiBi/WeiCha, and immediate momentum.\n\
                 - Order Book Relevance: HIGH. Use it to predict the price trend for the rest of TODAY."
            }
            MarketPhase::PreMarket | MarketPhase::PostMarket => {
                "- Current Status: Market Closed (Inter-day / Weekend)\n\
                 - Focus: Summarize the full-day performance, analyze Dragon & Tiger List data, and provide an outlook for the next trading day and the next 3 days.\n\
                 - Order Book Relevance: Low (Snapshot data is less relevant after close)."
            }
        }
    }
}

impl fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Current time in the exchange's time zone (UTC+8)
pub fn market_now() -> DateTime<FixedOffset> {
    let now = Utc::now();
    match FixedOffset::east_opt(MARKET_UTC_OFFSET_SECS) {
        Some(tz) => now.with_timezone(&tz),
        None => now.fixed_offset(),
    }
}
