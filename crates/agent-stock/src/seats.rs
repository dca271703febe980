//! Hot-money seat tagging
//!
//! Maps dragon-tiger brokerage seat names to well-known trader nicknames.
//! The table is configuration: built once, then only read.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Tag applied to every seat whose name contains `pattern`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainsRule {
    pub pattern: String,
    pub tag: String,
}

impl ContainsRule {
    pub fn new(pattern: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            tag: tag.into(),
        }
    }
}

/// Seat name to tag lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatTagger {
    /// Full seat name to tag
    #[serde(default)]
    exact: HashMap<String, String>,
    /// Substring rules, checked in order after the exact table
    #[serde(default)]
    contains: Vec<ContainsRule>,
}

impl SeatTagger {
    pub fn new(exact: HashMap<String, String>, contains: Vec<ContainsRule>) -> Self {
        Self { exact, contains }
    }

    /// Load a table from JSON: `{"exact": {seat: tag}, "contains": [{pattern, tag}]}`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            crate::StockError::Other(format!("Failed to read seat table {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Tags for one seat, exact match first, without duplicates
    pub fn tags<'a>(&'a self, seat: &str) -> Vec<&'a str> {
        let mut tags: Vec<&str> = Vec::new();
        if let Some(tag) = self.exact.get(seat) {
            tags.push(tag.as_str());
        }
        for rule in &self.contains {
            if seat.contains(rule.pattern.as_str()) && !tags.contains(&rule.tag.as_str()) {
                tags.push(rule.tag.as_str());
            }
        }
        tags
    }

    /// Seat name followed by its bracketed tags, e.g. `机构专用 [机构]`
    pub fn annotate(&self, seat: &str) -> String {
        let tags = self.tags(seat);
        if tags.is_empty() {
            seat.to_string()
        } else {
            let rendered: String = tags.iter().map(|t| format!("[{t}]")).collect();
            format!("{seat} {rendered}")
        }
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.contains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.contains.is_empty()
    }
}

impl Default for SeatTagger {
    fn default() -> Self {
        let exact = [
            ("华泰证券股份有限公司北京雍和宫证券营业部", "赵老哥"),
            ("中国银河证券股份有限公司北京绍兴路证券营业部", "赵老哥"),
            ("国泰君安证券股份有限公司上海江苏路证券营业部", "章盟主"),
            ("东方财富证券股份有限公司拉萨团结路第一证券营业部", "拉萨天团"),
            ("东方财富证券股份有限公司拉萨团结路第二证券营业部", "拉萨天团"),
            ("东方财富证券股份有限公司拉萨东环路第一证券营业部", "拉萨天团"),
            ("东方财富证券股份有限公司拉萨东环路第二证券营业部", "拉萨天团"),
            ("招商证券股份有限公司深圳益田路免税商务大厦证券营业部", "益田路"),
            ("中信证券股份有限公司上海溧阳路证券营业部", "孙哥"),
        ]
        .into_iter()
        .map(|(seat, tag)| (seat.to_string(), tag.to_string()))
        .collect();

        let contains = vec![
            ContainsRule::new("拉萨", "拉萨天团"),
            ContainsRule::new("机构专用", "机构"),
            ContainsRule::new("沪股通", "北向"),
            ContainsRule::new("深股通", "北向"),
        ];

        Self { exact, contains }
    }
}
