use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::core::config::Credentials;
use crate::core::currency::CurrencyRateProvider;
use crate::core::exchange::{
    Exchange, ExchangeBalance, ExchangeProvider, Holding, TopVolumeEntry, rank_by,
    screen_holdings,
};
use crate::core::fetch::ProviderError;
use crate::core::reference::{DisplayNames, NameTable, Namespace, ReferenceCache, ReferenceSource};
use crate::providers::util::{endpoint, number_from_any, optional_number_from_any, read_json};

/// Keyspace of Upbit market codes (`KRW-BTC`) in the reference cache.
pub const UPBIT_MARKETS: Namespace = Namespace::new("upbit.markets");

const QUOTE: &str = "KRW";

#[derive(Debug, Deserialize)]
struct UpbitAccount {
    currency: String,
    #[serde(deserialize_with = "number_from_any")]
    balance: f64,
    #[serde(default, deserialize_with = "number_from_any")]
    locked: f64,
    #[serde(default, deserialize_with = "optional_number_from_any")]
    avg_buy_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct UpbitTicker {
    market: String,
    trade_price: f64,
    #[serde(default)]
    prev_closing_price: f64,
    #[serde(default)]
    acc_trade_price_24h: f64,
    #[serde(default)]
    acc_trade_volume_24h: f64,
}

#[derive(Debug, Deserialize)]
struct UpbitMarket {
    market: String,
    korean_name: String,
    english_name: String,
}

#[derive(Debug, Serialize)]
struct UpbitClaims<'a> {
    access_key: &'a str,
    nonce: String,
}

/// Builds the `Authorization` header value for a private Upbit endpoint.
fn bearer_token(credentials: &Credentials) -> Result<String, ProviderError> {
    let claims = UpbitClaims {
        access_key: &credentials.access_key,
        nonce: Uuid::new_v4().to_string(),
    };
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(credentials.secret_key.as_bytes()),
    )
    .map_err(|e| ProviderError::Transport(format!("Failed to sign Upbit request: {e}")))?;
    Ok(format!("Bearer {token}"))
}

fn change_rate_percent(price: f64, prev_close: f64) -> f64 {
    if prev_close > 0.0 {
        (price - prev_close) / prev_close * 100.0
    } else {
        0.0
    }
}

pub struct UpbitProvider {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    names: ReferenceCache,
    dust_threshold: f64,
}

impl UpbitProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        credentials: Option<Credentials>,
        names: ReferenceCache,
        dust_threshold: f64,
    ) -> Self {
        UpbitProvider {
            client,
            base_url: base_url.to_string(),
            credentials,
            names,
            dust_threshold,
        }
    }

    async fn accounts(&self) -> Result<Vec<UpbitAccount>, ProviderError> {
        // Checked before any request is built
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ProviderError::MissingCredential("upbit"))?;

        let url = endpoint(&self.base_url, "/v1/accounts");
        debug!("Requesting accounts from {}", url);
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, bearer_token(credentials)?)
            .send()
            .await?;
        read_json(response, "upbit accounts").await
    }

    /// Current trade prices for the given markets, one batched request.
    async fn ticker_prices(&self, markets: &[String]) -> Result<HashMap<String, f64>, ProviderError> {
        let url = endpoint(&self.base_url, "/v1/ticker");
        debug!(count = markets.len(), "Requesting tickers from {}", url);
        let response = self
            .client
            .get(&url)
            .query(&[("markets", markets.join(","))])
            .send()
            .await?;
        let tickers: Vec<UpbitTicker> = read_json(response, "upbit ticker").await?;
        Ok(tickers
            .into_iter()
            .map(|t| (t.market, t.trade_price))
            .collect())
    }
}

#[async_trait]
impl ReferenceSource for UpbitProvider {
    fn namespace(&self) -> Namespace {
        UPBIT_MARKETS
    }

    #[instrument(name = "UpbitMarketDirectory", skip(self))]
    async fn fetch_all(&self) -> Result<NameTable, ProviderError> {
        let url = endpoint(&self.base_url, "/v1/market/all");
        debug!("Requesting market directory from {}", url);
        let response = self
            .client
            .get(&url)
            .query(&[("isDetails", "false")])
            .send()
            .await?;
        let markets: Vec<UpbitMarket> = read_json(response, "upbit market directory").await?;
        Ok(markets
            .into_iter()
            .map(|m| (m.market, DisplayNames::new(m.korean_name, m.english_name)))
            .collect())
    }
}

#[async_trait]
impl ExchangeProvider for UpbitProvider {
    fn exchange(&self) -> Exchange {
        Exchange::Upbit
    }

    #[instrument(name = "UpbitBalance", skip(self))]
    async fn fetch_balance(&self) -> Result<ExchangeBalance, ProviderError> {
        let accounts = self.accounts().await?;
        Ok(accounts
            .iter()
            .find(|a| a.currency == QUOTE)
            .map_or_else(ExchangeBalance::default, |a| {
                ExchangeBalance::new(a.balance, a.locked)
            }))
    }

    #[instrument(name = "UpbitHoldings", skip(self))]
    async fn fetch_holdings(&self) -> Result<Vec<Holding>, ProviderError> {
        let accounts: Vec<UpbitAccount> = self
            .accounts()
            .await?
            .into_iter()
            .filter(|a| a.currency != QUOTE && a.balance + a.locked > 0.0)
            .collect();
        if accounts.is_empty() {
            return Ok(Vec::new());
        }

        let markets: Vec<String> = accounts
            .iter()
            .map(|a| format!("{QUOTE}-{}", a.currency))
            .collect();
        // The ticker rejects the whole batch on one unknown market, so coins
        // without a KRW market (airdrops, delistings) stay unpriced.
        let listed = self.names.retain_listed(self, markets.clone()).await;
        let prices = if listed.is_empty() {
            HashMap::new()
        } else {
            self.ticker_prices(&listed).await?
        };

        let holdings = accounts
            .into_iter()
            .zip(markets.iter())
            .map(|(account, market)| {
                Holding::new(
                    account.currency,
                    account.balance,
                    account.locked,
                    account.avg_buy_price,
                    prices.get(market).copied(),
                )
            })
            .collect();
        Ok(screen_holdings(holdings, QUOTE, self.dust_threshold))
    }

    #[instrument(name = "UpbitTopVolume", skip(self))]
    async fn fetch_top_volume(&self, limit: usize) -> Result<Vec<TopVolumeEntry>, ProviderError> {
        let url = endpoint(&self.base_url, "/v1/ticker/all");
        debug!("Requesting all tickers from {}", url);
        let response = self
            .client
            .get(&url)
            .query(&[("quote_currencies", QUOTE)])
            .send()
            .await?;
        let tickers: Vec<UpbitTicker> = read_json(response, "upbit ticker/all").await?;

        let prefix = format!("{QUOTE}-");
        let krw_markets: Vec<UpbitTicker> = tickers
            .into_iter()
            .filter(|t| t.market.starts_with(&prefix))
            .collect();
        let ranked = rank_by(krw_markets, limit, |t| t.acc_trade_price_24h);

        let names = self
            .names
            .resolve_all(self, ranked.iter().map(|t| t.market.as_str()))
            .await;

        Ok(ranked
            .into_iter()
            .zip(names)
            .map(|(ticker, names)| TopVolumeEntry {
                base_asset: ticker.market[prefix.len()..].to_string(),
                change_rate_percent: change_rate_percent(
                    ticker.trade_price,
                    ticker.prev_closing_price,
                ),
                current_price: ticker.trade_price,
                base_volume: ticker.acc_trade_volume_24h,
                quote_volume: ticker.acc_trade_price_24h,
                symbol: ticker.market,
                names,
            })
            .collect())
    }
}

#[async_trait]
impl CurrencyRateProvider for UpbitProvider {
    /// Spot rate from the `{to}-{from}` market, e.g. `KRW-USDT`.
    #[instrument(name = "UpbitRate", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, ProviderError> {
        let market = format!("{to}-{from}");
        let prices = self.ticker_prices(std::slice::from_ref(&market)).await?;
        prices
            .get(&market)
            .copied()
            .ok_or_else(|| ProviderError::Malformed(format!("No ticker found for market: {market}")))
    }
}
