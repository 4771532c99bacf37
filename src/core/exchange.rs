//! Exchange account and market abstractions

use crate::core::fetch::ProviderError;
use crate::core::reference::DisplayNames;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Holdings worth less than this many units of quote currency are dropped.
pub const DEFAULT_DUST_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Upbit,
    Binance,
}

impl Exchange {
    pub fn quote_currency(&self) -> &'static str {
        match self {
            Exchange::Upbit => "KRW",
            Exchange::Binance => "USDT",
        }
    }
}

impl Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Exchange::Upbit => "upbit",
                Exchange::Binance => "binance",
            }
        )
    }
}

impl FromStr for Exchange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upbit" => Ok(Exchange::Upbit),
            "binance" => Ok(Exchange::Binance),
            _ => Err(anyhow::anyhow!("Unknown exchange: {}", s)),
        }
    }
}

/// Quote-currency cash on an exchange account.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExchangeBalance {
    pub total: f64,
    pub available: f64,
    pub locked: f64,
}

impl ExchangeBalance {
    pub fn new(available: f64, locked: f64) -> Self {
        Self {
            total: available + locked,
            available,
            locked,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
    pub quantity: f64,
    pub avg_cost: Option<f64>,
    /// `None` when no market price could be found for the asset.
    pub current_price: Option<f64>,
    pub eval_value: f64,
}

impl Holding {
    pub fn new(
        asset: impl Into<String>,
        free: f64,
        locked: f64,
        avg_cost: Option<f64>,
        current_price: Option<f64>,
    ) -> Self {
        let quantity = free + locked;
        let eval_value = current_price.map_or(0.0, |price| quantity * price);
        Self {
            asset: asset.into(),
            free,
            locked,
            quantity,
            avg_cost,
            current_price,
            eval_value,
        }
    }

    /// Percent gain of the current price over the average cost, 2 dp.
    pub fn profit_rate(&self) -> f64 {
        match (self.avg_cost, self.current_price) {
            (Some(avg), Some(price)) if avg > 0.0 && price > 0.0 => {
                round_to(((price - avg) / avg) * 100.0, 2)
            }
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopVolumeEntry {
    pub symbol: String,
    pub base_asset: String,
    pub names: DisplayNames,
    pub current_price: f64,
    pub change_rate_percent: f64,
    pub base_volume: f64,
    /// 24h notional volume in the quote currency; the ranking key.
    pub quote_volume: f64,
}

#[async_trait]
pub trait ExchangeProvider: Send + Sync {
    fn exchange(&self) -> Exchange;

    async fn fetch_balance(&self) -> Result<ExchangeBalance, ProviderError>;

    async fn fetch_holdings(&self) -> Result<Vec<Holding>, ProviderError>;

    async fn fetch_top_volume(&self, limit: usize) -> Result<Vec<TopVolumeEntry>, ProviderError>;
}

/// Sorts descending by `key` and keeps the first `limit` items. The sort is
/// stable, so ties keep their upstream order. NaN keys rank last.
pub fn rank_by<T>(mut items: Vec<T>, limit: usize, key: impl Fn(&T) -> f64) -> Vec<T> {
    let rank_key = |item: &T| {
        let value = key(item);
        if value.is_nan() {
            f64::NEG_INFINITY
        } else {
            value
        }
    };
    items.sort_by(|a, b| rank_key(b).total_cmp(&rank_key(a)));
    items.truncate(limit);
    items
}

/// Drops the quote currency's own row, empty rows and dust, then orders by
/// evaluated value.
pub fn screen_holdings(holdings: Vec<Holding>, quote_currency: &str, dust_threshold: f64) -> Vec<Holding> {
    let kept: Vec<Holding> = holdings
        .into_iter()
        .filter(|h| !h.asset.eq_ignore_ascii_case(quote_currency))
        .filter(|h| h.quantity > 0.0)
        .filter(|h| h.eval_value >= dust_threshold)
        .collect();
    let len = kept.len();
    rank_by(kept, len, |h| h.eval_value)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
