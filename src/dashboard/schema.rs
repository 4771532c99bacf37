//! External JSON shapes served to the dashboard front end. Field names are
//! part of the wire contract; every collection on a composite is `null`
//! rather than empty when its source had nothing to offer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::currency::RateSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpbitBalanceView {
    pub total_krw: f64,
    pub available_krw: f64,
    pub locked_krw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpbitHoldingView {
    pub currency: String,
    pub balance: f64,
    pub locked: f64,
    pub total: f64,
    pub avg_buy_price: f64,
    pub current_price: Option<f64>,
    pub eval_amount: f64,
    pub profit_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpbitTopCoinView {
    pub market: String,
    pub korean_name: String,
    pub english_name: String,
    /// 24h base volume.
    pub trade_volume: f64,
    /// 24h KRW notional.
    pub trade_price: f64,
    pub current_price: f64,
    pub change_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinanceBalanceView {
    pub total_usdt: f64,
    pub available_usdt: f64,
    pub locked_usdt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinanceHoldingView {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
    pub total: f64,
    pub current_price: Option<f64>,
    pub eval_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinanceTopCoinView {
    pub symbol: String,
    pub base_asset: String,
    pub quote_volume: f64,
    pub volume: f64,
    pub current_price: f64,
    pub price_change_percent: f64,
    pub current_price_krw: f64,
    pub quote_volume_krw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BalanceView {
    Upbit(UpbitBalanceView),
    Binance(BinanceBalanceView),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HoldingsView {
    Upbit(Vec<UpbitHoldingView>),
    Binance(Vec<BinanceHoldingView>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopVolumeView {
    Upbit(Vec<UpbitTopCoinView>),
    Binance(Vec<BinanceTopCoinView>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FearGreedView {
    pub value: u32,
    pub value_classification: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleAlertView {
    pub coin: String,
    pub amount: f64,
    pub sender: String,
    pub receiver: String,
    pub value_usd: f64,
    pub timestamp: DateTime<Utc>,
}

/// The single rate applied to every converted field of one response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateView {
    pub value: f64,
    pub source: RateSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub upbit_balance: Option<UpbitBalanceView>,
    pub upbit_holdings: Option<Vec<UpbitHoldingView>>,
    pub upbit_top_volume: Option<Vec<UpbitTopCoinView>>,
    pub binance_balance: Option<BinanceBalanceView>,
    pub binance_holdings: Option<Vec<BinanceHoldingView>>,
    pub binance_top_volume: Option<Vec<BinanceTopCoinView>>,
    pub fear_greed: Option<FearGreedView>,
    pub whale_alerts: Option<Vec<WhaleAlertView>>,
    pub usdt_krw_rate: RateView,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KoreaStockView {
    pub code: String,
    pub name: String,
    pub current_price: i64,
    pub change_rate: f64,
    pub trade_volume: u64,
    pub trade_value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsStockView {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub change_rate: f64,
    pub trade_volume: u64,
    pub trade_value: f64,
    pub current_price_krw: f64,
    pub trade_value_krw: f64,
}

/// ETFs are US listings too; only their ranking differs.
pub type EtfView = UsStockView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockIndexView {
    pub name: String,
    pub symbol: String,
    pub current_price: f64,
    pub change: f64,
    pub change_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorView {
    pub name: String,
    pub change_rate: f64,
    /// Strength label; the front end reads it from `volume`.
    #[serde(rename = "volume")]
    pub strength: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsView {
    pub title: String,
    pub link: String,
    pub date: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDashboardData {
    pub kospi_top: Option<Vec<KoreaStockView>>,
    pub kosdaq_top: Option<Vec<KoreaStockView>>,
    pub us_top: Option<Vec<UsStockView>>,
    pub indices: Option<Vec<StockIndexView>>,
    pub sectors: Option<Vec<SectorView>>,
    pub etf_ranking: Option<Vec<EtfView>>,
    pub news: Option<Vec<NewsView>>,
    pub usd_krw_rate: RateView,
    pub last_updated: DateTime<Utc>,
}
