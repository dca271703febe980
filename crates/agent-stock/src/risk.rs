//! Abnormal-fluctuation risk control
//!
//! The interval return of a stock over the last `w` trading days is compared
//! with its board benchmark over the same dates. The difference (deviation)
//! is checked against board-specific limits:
//!
//! | board | window | upper | lower |
//! |---|---|---|---|
//! | Beijing | 3 | +40 | -40 |
//! | others | 10 | +100 | -50 |
//! | others | 30 | +200 | -70 |
//!
//! Only bars with non-zero volume count as trading days. When the stock has
//! fewer bars than a window needs, the oldest available bar anchors the
//! window. A benchmark close missing at either end of the interval makes the
//! benchmark return 0.
//!
//! The 10- and 30-day deviations are computed for every board, Beijing
//! included, and travel with each finding so a passing check still reports
//! them.

use crate::code::{Board, StockCode};
use crate::error::{Result, StockError};
use crate::provider::DataProvider;
use agent_core::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// One daily K-line bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
    pub change_pct: f64,
}

impl DailyBar {
    fn is_trading_day(&self) -> bool {
        self.volume > 0.0 && self.close > 0.0
    }
}

/// Source of daily price history, addressed by EastMoney secid
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    /// Up to `limit` most recent daily bars, oldest first
    async fn daily_bars(&self, secid: &str, limit: usize) -> Result<Vec<DailyBar>>;
}

/// Deviation limits for one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowRule {
    pub window_days: usize,
    pub upper: f64,
    pub lower: f64,
}

const REFERENCE_WINDOWS: (usize, usize) = (10, 30);

const BEIJING_RULES: &[WindowRule] = &[WindowRule {
    window_days: 3,
    upper: 40.0,
    lower: -40.0,
}];

const DEFAULT_RULES: &[WindowRule] = &[
    WindowRule {
        window_days: 10,
        upper: 100.0,
        lower: -50.0,
    },
    WindowRule {
        window_days: 30,
        upper: 200.0,
        lower: -70.0,
    },
];

/// Result of checking one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub board: Board,
    pub window_days: usize,
    pub deviation_percent: f64,
    /// Crossed limit when triggered, otherwise the upper limit
    pub threshold_percent: f64,
    pub triggered: bool,
    pub deviation_10d: f64,
    pub deviation_30d: f64,
}

impl RiskFinding {
    /// Human-readable line, as shown to the model
    pub fn describe(&self) -> String {
        let direction = if self.deviation_percent >= 0.0 { "涨幅" } else { "跌幅" };
        let board = if self.board == Board::Beijing {
            format!(" ({})", self.board)
        } else {
            String::new()
        };
        format!(
            "⚠️ 严重异动预警{board}: 近{}日累计{direction}偏离值达 {:.2}% (阈值 {}%)",
            self.window_days, self.deviation_percent, self.threshold_percent
        )
    }
}

/// Deterministic deviation calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskControlEngine;

impl RiskControlEngine {
    pub fn new() -> Self {
        Self
    }

    /// Rules applied to a board
    pub fn rules(board: Board) -> &'static [WindowRule] {
        match board {
            Board::Beijing => BEIJING_RULES,
            _ => DEFAULT_RULES,
        }
    }

    /// Check a stock against its board benchmark
    ///
    /// Returns the triggered findings when any rule fires, otherwise a single
    /// passed finding for the board's longest window. Every finding carries
    /// the 10- and 30-day deviations. An empty result means fewer than two
    /// trading days were available.
    pub fn check(&self, code: &StockCode, stock: &[DailyBar], benchmark: &[DailyBar]) -> Vec<RiskFinding> {
        let board = code.board();
        let mut series: Vec<&DailyBar> = stock.iter().filter(|b| b.is_trading_day()).collect();
        series.sort_by_key(|b| b.date);
        if series.len() < 2 {
            return Vec::new();
        }

        let bench_closes: HashMap<NaiveDate, f64> = benchmark
            .iter()
            .filter(|b| b.is_trading_day())
            .map(|b| (b.date, b.close))
            .collect();

        let (ten, thirty) = REFERENCE_WINDOWS;
        let deviation_10d = window_deviation(&series, &bench_closes, ten);
        let deviation_30d = window_deviation(&series, &bench_closes, thirty);

        let mut evaluated: Vec<RiskFinding> = Self::rules(board)
            .iter()
            .map(|rule| {
                let deviation = window_deviation(&series, &bench_closes, rule.window_days);
                let (triggered, threshold) = if deviation >= rule.upper {
                    (true, rule.upper)
                } else if deviation <= rule.lower {
                    (true, rule.lower)
                } else {
                    (false, rule.upper)
                };
                RiskFinding {
                    board,
                    window_days: rule.window_days,
                    deviation_percent: deviation,
                    threshold_percent: threshold,
                    triggered,
                    deviation_10d,
                    deviation_30d,
                }
            })
            .collect();

        debug!(code = %code, board = ?board, findings = ?evaluated, "Risk windows evaluated");

        if evaluated.iter().any(|f| f.triggered) {
            evaluated.retain(|f| f.triggered);
            evaluated
        } else {
            // rules are ordered by window, so the last one is the longest
            evaluated.pop().into_iter().collect()
        }
    }

    /// Render findings as the text block placed in the dossier
    pub fn render(board: Board, findings: &[RiskFinding]) -> String {
        if findings.is_empty() {
            return format!("无法进行量化风控检查: 交易日数据不足 ({board})");
        }
        if findings.iter().any(|f| f.triggered) {
            return findings
                .iter()
                .filter(|f| f.triggered)
                .map(RiskFinding::describe)
                .collect::<Vec<_>>()
                .join("\n");
        }
        let passed = &findings[0];
        format!(
            "✅ 偏离值检查通过 ({board}): 10日偏离 {:.2}%, 30日偏离 {:.2}%",
            passed.deviation_10d, passed.deviation_30d
        )
    }
}

/// Percentage change from `from` to `to`
fn pct_change(from: f64, to: f64) -> f64 {
    (to / from - 1.0) * 100.0
}

fn window_deviation(series: &[&DailyBar], bench_closes: &HashMap<NaiveDate, f64>, window: usize) -> f64 {
    let end = series[series.len() - 1];
    let start = series[series.len().saturating_sub(window + 1)];

    let stock_pct = pct_change(start.close, end.close);
    let bench_pct = match (bench_closes.get(&start.date), bench_closes.get(&end.date)) {
        (Some(&from), Some(&to)) if from > 0.0 => pct_change(from, to),
        _ => 0.0,
    };
    stock_pct - bench_pct
}

/// Risk control exposed as a data provider
pub struct RiskControlProvider {
    history: Arc<dyn PriceHistorySource>,
    engine: RiskControlEngine,
    stock_days: usize,
    benchmark_days: usize,
}

impl RiskControlProvider {
    pub const NAME: &'static str = "Risk Control";

    pub fn new(history: Arc<dyn PriceHistorySource>, stock_days: usize, benchmark_days: usize) -> Self {
        Self {
            history,
            engine: RiskControlEngine::new(),
            stock_days,
            benchmark_days,
        }
    }

    /// Fetch both series and run the engine
    pub async fn evaluate(&self, code: &StockCode) -> Result<Vec<RiskFinding>> {
        let board = code.board();
        let stock = self
            .history
            .daily_bars(&code.secid(), self.stock_days)
            .await
            .map_err(|e| StockError::upstream(Self::NAME, format!("stock series: {}", e.reason())))?;
        let benchmark = self
            .history
            .daily_bars(board.benchmark_secid(), self.benchmark_days)
            .await
            .map_err(|e| StockError::upstream(Self::NAME, format!("benchmark series: {}", e.reason())))?;

        let findings = self.engine.check(code, &stock, &benchmark);
        info!(
            code = %code,
            board = %board,
            triggered = findings.iter().filter(|f| f.triggered).count(),
            "Risk control evaluated"
        );
        Ok(findings)
    }
}

#[async_trait]
impl DataProvider for RiskControlProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Quantitative abnormal-fluctuation check: cumulative deviation of the stock versus its board index over 3/10/30 trading days against exchange thresholds."
    }

    async fn fetch(&self, _ctx: &Context, input: &str) -> Result<String> {
        let code = StockCode::parse(input)?;
        let findings = self.evaluate(&code).await?;
        Ok(RiskControlEngine::render(code.board(), &findings))
    }
}
