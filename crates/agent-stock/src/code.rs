//! A-share stock codes and listing boards
//!
//! Codes are written as an optional `sh`/`sz` exchange prefix plus six
//! digits. All comparisons use the six-digit form; the prefix only matters
//! for display and for addressing upstream endpoints.

use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exchange a code is listed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Sh,
    Sz,
    /// Bare code whose leading digit maps to neither exchange prefix
    Unknown,
}

impl Exchange {
    pub fn prefix(self) -> &'static str {
        match self {
            Exchange::Sh => "sh",
            Exchange::Sz => "sz",
            Exchange::Unknown => "",
        }
    }

    /// Exchange implied by the leading digit of a bare code
    fn infer(digits: &str) -> Self {
        match digits.as_bytes().first() {
            Some(b'6') => Exchange::Sh,
            Some(b'0' | b'3') => Exchange::Sz,
            _ => Exchange::Unknown,
        }
    }
}

/// A parsed stock code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StockCode {
    exchange: Exchange,
    digits: String,
}

impl StockCode {
    /// Parse `sh600519`, `SZ000001`, `600519` or `000001.SZ`
    pub fn parse(input: &str) -> Result<Self> {
        let lowered = input.trim().to_ascii_lowercase();
        let invalid = || StockError::InvalidCode(input.trim().to_string());

        let (prefix, digits) = if let Some((digits, suffix)) = lowered.split_once('.') {
            (Some(suffix), digits)
        } else if lowered.len() == 8 {
            let (prefix, digits) = lowered.split_at_checked(2).ok_or_else(invalid)?;
            (Some(prefix), digits)
        } else {
            (None, lowered.as_str())
        };

        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let exchange = match prefix {
            Some("sh") => Exchange::Sh,
            Some("sz") => Exchange::Sz,
            Some(_) => return Err(invalid()),
            None => Exchange::infer(digits),
        };

        Ok(Self {
            exchange,
            digits: digits.to_string(),
        })
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Trailing six-digit form
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Whether the code carries (or could be given) an exchange prefix
    pub fn is_prefixed(&self) -> bool {
        self.exchange != Exchange::Unknown
    }

    /// EastMoney market-qualified id, e.g. `1.600519`
    pub fn secid(&self) -> String {
        let market = if self.digits.starts_with('6') { 1 } else { 0 };
        format!("{market}.{}", self.digits)
    }

    pub fn board(&self) -> Board {
        Board::classify(&self.digits)
    }
}

impl fmt::Display for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.exchange.prefix(), self.digits)
    }
}

impl FromStr for StockCode {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Normalize a code to its prefixed form; `None` when no prefix applies
pub fn normalize_code(input: &str) -> Option<String> {
    StockCode::parse(input)
        .ok()
        .filter(StockCode::is_prefixed)
        .map(|code| code.to_string())
}

/// Listing board, which decides the risk thresholds and benchmark index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Board {
    Star,
    ShanghaiMain,
    ChiNext,
    Beijing,
    ShenzhenMain,
}

impl Board {
    /// Classify by the six-digit code
    pub fn classify(digits: &str) -> Self {
        if digits.starts_with("688") {
            Board::Star
        } else if digits.starts_with('6') {
            Board::ShanghaiMain
        } else if digits.starts_with('3') {
            Board::ChiNext
        } else if digits.starts_with(['4', '8', '9']) {
            Board::Beijing
        } else {
            Board::ShenzhenMain
        }
    }

    /// EastMoney id of the benchmark index
    pub fn benchmark_secid(self) -> &'static str {
        match self {
            Board::Star => "1.000688",
            Board::ShanghaiMain => "1.000001",
            Board::ChiNext => "0.399006",
            Board::Beijing => "0.899050",
            Board::ShenzhenMain => "0.399107",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Board::Star => "科创板",
            Board::ShanghaiMain => "沪市主板",
            Board::ChiNext => "创业板",
            Board::Beijing => "北交所",
            Board::ShenzhenMain => "深市主板",
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
