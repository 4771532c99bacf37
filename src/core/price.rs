//! Equity quote abstractions and core types

use crate::core::exchange::round_to;
use crate::core::fetch::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityQuote {
    pub symbol: String,
    pub short_name: Option<String>,
    pub currency: Option<String>,
    pub price: f64,
    pub previous_close: Option<f64>,
    pub volume: u64,
    /// Daily closes, oldest first, gaps removed.
    pub closes: Vec<f64>,
}

impl EquityQuote {
    pub fn change_rate(&self) -> f64 {
        match self.previous_close {
            Some(prev) if prev > 0.0 => ((self.price - prev) / prev) * 100.0,
            _ => 0.0,
        }
    }

    pub fn trade_value(&self) -> f64 {
        self.price * self.volume as f64
    }
}

/// A symbol in a configured universe with an optional display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedSymbol {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl ListedSymbol {
    pub fn new(symbol: &str, name: Option<&str>) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.map(str::to_string),
        }
    }

    /// Symbol without the exchange suffix (`005930.KS` -> `005930`).
    pub fn code(&self) -> &str {
        self.symbol
            .split_once('.')
            .map_or(self.symbol.as_str(), |(code, _)| code)
    }
}

/// One row of a top-volume equity list.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityEntry {
    pub symbol: String,
    pub code: String,
    pub name: String,
    pub price: f64,
    pub change_rate: f64,
    pub volume: u64,
    pub trade_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_rate: f64,
}

impl IndexSnapshot {
    /// Needs at least two closes; the last one is the current level.
    pub fn from_closes(name: &str, symbol: &str, closes: &[f64]) -> Option<Self> {
        let [.., prev, current] = closes else {
            return None;
        };
        if *prev <= 0.0 {
            return None;
        }
        let change = current - prev;
        Some(Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            price: round_to(*current, 2),
            change: round_to(change, 2),
            change_rate: round_to(change / prev * 100.0, 2),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectorTrend {
    Strong,
    Weak,
    Flat,
}

impl SectorTrend {
    const BAND: f64 = 0.5;

    pub fn from_change(change_rate: f64) -> Self {
        if change_rate > Self::BAND {
            SectorTrend::Strong
        } else if change_rate < -Self::BAND {
            SectorTrend::Weak
        } else {
            SectorTrend::Flat
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SectorTrend::Strong => "Strong",
            SectorTrend::Weak => "Weak",
            SectorTrend::Flat => "Flat",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorSnapshot {
    pub name: String,
    pub change_rate: f64,
    pub trend: SectorTrend,
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quote(&self, symbol: &str) -> Result<EquityQuote, ProviderError>;
}
