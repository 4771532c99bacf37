use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::config::Credentials;
use crate::core::exchange::{
    Exchange, ExchangeBalance, ExchangeProvider, Holding, TopVolumeEntry, rank_by,
    screen_holdings,
};
use crate::core::fetch::ProviderError;
use crate::core::reference::DisplayNames;
use crate::providers::util::{endpoint, number_from_any, read_json};

type HmacSha256 = Hmac<Sha256>;

const QUOTE: &str = "USDT";
const RECV_WINDOW_MS: u32 = 5000;
const API_KEY_HEADER: &str = "X-MBX-APIKEY";

#[derive(Debug, Deserialize)]
struct BinanceAccount {
    balances: Vec<BinanceBalance>,
}

#[derive(Debug, Deserialize)]
struct BinanceBalance {
    asset: String,
    #[serde(deserialize_with = "number_from_any")]
    free: f64,
    #[serde(deserialize_with = "number_from_any")]
    locked: f64,
}

#[derive(Debug, Deserialize)]
struct BinancePrice {
    symbol: String,
    #[serde(deserialize_with = "number_from_any")]
    price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Binance24hTicker {
    symbol: String,
    #[serde(deserialize_with = "number_from_any")]
    last_price: f64,
    #[serde(deserialize_with = "number_from_any")]
    price_change_percent: f64,
    #[serde(deserialize_with = "number_from_any")]
    volume: f64,
    #[serde(deserialize_with = "number_from_any")]
    quote_volume: f64,
}

/// Hex HMAC-SHA256 of the query string, as Binance expects in `signature`.
fn sign(secret: &str, payload: &str) -> Result<String, ProviderError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ProviderError::Transport(format!("Failed to sign Binance request: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub struct BinanceProvider {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    dust_threshold: f64,
}

impl BinanceProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        credentials: Option<Credentials>,
        dust_threshold: f64,
    ) -> Self {
        BinanceProvider {
            client,
            base_url: base_url.to_string(),
            credentials,
            dust_threshold,
        }
    }

    async fn account(&self) -> Result<BinanceAccount, ProviderError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ProviderError::MissingCredential("binance"))?;

        let query = format!(
            "recvWindow={RECV_WINDOW_MS}&timestamp={}",
            chrono::Utc::now().timestamp_millis()
        );
        let signature = sign(&credentials.secret_key, &query)?;
        let url = format!(
            "{}?{query}&signature={signature}",
            endpoint(&self.base_url, "/api/v3/account")
        );
        debug!("Requesting signed account data");

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, credentials.access_key.as_str())
            .send()
            .await?;
        read_json(response, "binance account").await
    }

    async fn all_prices(&self) -> Result<HashMap<String, f64>, ProviderError> {
        let url = endpoint(&self.base_url, "/api/v3/ticker/price");
        debug!("Requesting prices from {}", url);
        let response = self.client.get(&url).send().await?;
        let prices: Vec<BinancePrice> = read_json(response, "binance ticker/price").await?;
        Ok(prices.into_iter().map(|p| (p.symbol, p.price)).collect())
    }
}

#[async_trait]
impl ExchangeProvider for BinanceProvider {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    #[instrument(name = "BinanceBalance", skip(self))]
    async fn fetch_balance(&self) -> Result<ExchangeBalance, ProviderError> {
        let account = self.account().await?;
        Ok(account
            .balances
            .iter()
            .find(|b| b.asset == QUOTE)
            .map_or_else(ExchangeBalance::default, |b| {
                ExchangeBalance::new(b.free, b.locked)
            }))
    }

    #[instrument(name = "BinanceHoldings", skip(self))]
    async fn fetch_holdings(&self) -> Result<Vec<Holding>, ProviderError> {
        let balances: Vec<BinanceBalance> = self
            .account()
            .await?
            .balances
            .into_iter()
            .filter(|b| b.asset != QUOTE && b.free + b.locked > 0.0)
            .collect();
        if balances.is_empty() {
            return Ok(Vec::new());
        }

        let prices = self.all_prices().await?;
        let holdings = balances
            .into_iter()
            .map(|b| {
                let price = prices.get(&format!("{}{QUOTE}", b.asset)).copied();
                Holding::new(b.asset, b.free, b.locked, None, price)
            })
            .collect();
        Ok(screen_holdings(holdings, QUOTE, self.dust_threshold))
    }

    #[instrument(name = "BinanceTopVolume", skip(self))]
    async fn fetch_top_volume(&self, limit: usize) -> Result<Vec<TopVolumeEntry>, ProviderError> {
        let url = endpoint(&self.base_url, "/api/v3/ticker/24hr");
        debug!("Requesting 24h tickers from {}", url);
        let response = self.client.get(&url).send().await?;
        let tickers: Vec<Binance24hTicker> = read_json(response, "binance ticker/24hr").await?;

        let usdt_pairs: Vec<Binance24hTicker> = tickers
            .into_iter()
            .filter(|t| t.symbol.len() > QUOTE.len() && t.symbol.ends_with(QUOTE))
            .collect();

        Ok(rank_by(usdt_pairs, limit, |t| t.quote_volume)
            .into_iter()
            .map(|ticker| {
                let base_asset = ticker.symbol[..ticker.symbol.len() - QUOTE.len()].to_string();
                TopVolumeEntry {
                    names: DisplayNames::fallback(&base_asset),
                    base_asset,
                    symbol: ticker.symbol,
                    current_price: ticker.last_price,
                    change_rate_percent: ticker.price_change_percent,
                    base_volume: ticker.volume,
                    quote_volume: ticker.quote_volume,
                }
            })
            .collect())
    }
}
