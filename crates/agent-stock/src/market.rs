//! Market-wide snapshot and its text summaries
//!
//! A snapshot is collected outside this crate (sector ranking, limit-up
//! pool, dragon-tiger list for one date) and rendered here into the blocks
//! used by the review and pre-market analysis prompts.

use crate::error::Result;
use crate::seats::SeatTagger;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

const TOP_SECTORS: usize = 10;
const TOP_DRAGON_TIGER: usize = 5;
const SEATS_PER_ITEM: usize = 2;
const NO_DATA: &str = "No sufficient data available";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorInfo {
    pub name: String,
    pub change_percent: f64,
    pub net_inflow: f64,
    pub top_stock_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitUpStock {
    pub code: String,
    pub name: String,
    /// Consecutive limit-up days, 1 for a first board
    pub board_count: u32,
    pub reason: String,
    pub change_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeatAmount {
    pub name: String,
    /// Net amount in yuan
    pub net_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragonTigerItem {
    pub code: String,
    pub name: String,
    pub change_percent: f64,
    /// Net inflow in yuan
    pub net_inflow: f64,
    pub reason: String,
    pub buy_seats: Vec<SeatAmount>,
}

/// Market data for one trading date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSnapshot {
    pub date: String,
    pub sectors: Vec<SectorInfo>,
    pub limit_ups: Vec<LimitUpStock>,
    pub dragon_tiger: Vec<DragonTigerItem>,
}

impl MarketSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            crate::error::StockError::Other(format!("Failed to read snapshot {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty() && self.limit_ups.is_empty() && self.dragon_tiger.is_empty()
    }

    /// Top sectors by the collector's ranking
    pub fn sector_summary(&self) -> String {
        let mut out = String::from("Top Sectors:\n");
        if self.sectors.is_empty() {
            out.push_str(NO_DATA);
            return out;
        }
        for s in self.sectors.iter().take(TOP_SECTORS) {
            let _ = writeln!(
                out,
                "- {}: {:+.2}% (Net Inflow: {:.2}), Top Stock: {}",
                s.name, s.change_percent, s.net_inflow, s.top_stock_name
            );
        }
        out
    }

    /// Limit-up pool grouped by consecutive-board height
    pub fn limit_up_summary(&self) -> String {
        let mut out = format!("Limit Up Pool (Total: {}):\n", self.limit_ups.len());
        if self.limit_ups.is_empty() {
            out.push_str(NO_DATA);
            return out;
        }

        let mut groups: BTreeMap<u32, Vec<&LimitUpStock>> = BTreeMap::new();
        for stock in &self.limit_ups {
            groups.entry(stock.board_count.clamp(1, TOP_BUCKET)).or_default().push(stock);
        }

        let highest = self.limit_ups.iter().map(|s| s.board_count).max().unwrap_or(1);
        let _ = writeln!(out, "Highest board: {highest}");
        for (&height, stocks) in groups.iter().rev() {
            let names: Vec<String> = stocks
                .iter()
                .map(|s| {
                    if s.board_count > TOP_BUCKET {
                        format!("{}({}连板)", s.name, s.board_count)
                    } else {
                        s.name.clone()
                    }
                })
                .collect();
            let _ = writeln!(out, "{} ({}): {}", bucket_label(height), stocks.len(), names.join(", "));
        }

        for s in &self.limit_ups {
            let _ = writeln!(
                out,
                "- {}: {}, {}, {:+.2}%",
                s.name,
                board_label(s.board_count.max(1)),
                s.reason,
                s.change_percent
            );
        }
        out
    }

    /// Top net-buy dragon-tiger entries with tagged buy seats
    pub fn dragon_tiger_summary(&self, tagger: &SeatTagger) -> String {
        let mut out = String::from("Dragon Tiger List (Top 5 Net Buy):\n");
        if self.dragon_tiger.is_empty() {
            out.push_str(NO_DATA);
            return out;
        }

        let mut items: Vec<&DragonTigerItem> = self.dragon_tiger.iter().collect();
        items.sort_by(|a, b| b.net_inflow.total_cmp(&a.net_inflow));

        for item in items.into_iter().take(TOP_DRAGON_TIGER) {
            let _ = writeln!(
                out,
                "- {} ({}): {:+.2}%, Net: {:.1} Wan, Reason: {}",
                item.name,
                item.code,
                item.change_percent,
                item.net_inflow / 10_000.0,
                item.reason
            );
            if !item.buy_seats.is_empty() {
                let seats: Vec<String> = item
                    .buy_seats
                    .iter()
                    .take(SEATS_PER_ITEM)
                    .map(|seat| format!("{}({:.0})", tagger.annotate(&seat.name), seat.net_amount / 10_000.0))
                    .collect();
                let _ = writeln!(out, "  [Buy Seats]: {}", seats.join(", "));
            }
        }
        out
    }
}

/// Heights at or above this share one group
const TOP_BUCKET: u32 = 5;

fn bucket_label(height: u32) -> String {
    if height >= TOP_BUCKET {
        format!("{TOP_BUCKET}连板+")
    } else {
        board_label(height)
    }
}

fn board_label(height: u32) -> String {
    if height <= 1 {
        "首板".to_string()
    } else {
        format!("{height}连板")
    }
}

/// Post-close market review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketReview {
    pub summary: String,
    pub sector_analysis: String,
    pub sentiment_analysis: String,
    pub key_risks: Vec<String>,
    pub opportunities: Vec<String>,
}

/// Pre-market analysis for the next session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketAnalysis {
    pub hot_stocks: Vec<String>,
    pub recommended_stocks: Vec<String>,
    pub risks: Vec<String>,
    pub opportunities: Vec<String>,
    pub analysis_summary: String,
}
