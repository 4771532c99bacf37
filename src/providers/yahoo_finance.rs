use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::currency::CurrencyRateProvider;
use crate::core::fetch::ProviderError;
use crate::core::price::{EquityQuote, QuoteProvider};
use crate::providers::util::{endpoint, read_json};

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_volume: Option<f64>,
    short_name: Option<String>,
    long_name: Option<String>,
    currency: Option<String>,
}

impl ChartItem {
    fn quote(&self) -> Option<&Quote> {
        self.indicators.as_ref().and_then(|i| i.quote.first())
    }

    fn closes(&self) -> Vec<f64> {
        self.quote()
            .and_then(|q| q.close.as_ref())
            .map(|closes| closes.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    fn last_volume(&self) -> Option<f64> {
        self.quote()
            .and_then(|q| q.volume.as_ref())
            .and_then(|volumes| volumes.iter().rev().flatten().next().copied())
    }

    fn into_quote(self, symbol: &str) -> Option<EquityQuote> {
        let closes = self.closes();
        let price = self
            .meta
            .regular_market_price
            .or_else(|| closes.last().copied())?;

        // Bars win over meta: the meta previous close is often a week old
        let previous_close = match closes.as_slice() {
            [.., prev, _] => Some(*prev),
            _ => self.meta.previous_close.or(self.meta.chart_previous_close),
        };
        let volume = self
            .meta
            .regular_market_volume
            .or_else(|| self.last_volume())
            .unwrap_or(0.0)
            .max(0.0) as u64;

        Some(EquityQuote {
            symbol: symbol.to_string(),
            short_name: self.meta.short_name.or(self.meta.long_name),
            currency: self.meta.currency,
            price,
            previous_close,
            volume,
            closes,
        })
    }
}

async fn fetch_chart(
    client: &reqwest::Client,
    base_url: &str,
    symbol: &str,
    context: &str,
) -> Result<Option<ChartItem>, ProviderError> {
    let url = endpoint(base_url, &format!("/v8/finance/chart/{symbol}"));
    debug!("Requesting chart data from {}", url);

    let response = client
        .get(&url)
        .query(&[("range", "5d"), ("interval", "1d")])
        .send()
        .await?;
    let data: YahooChartResponse = read_json(response, context).await?;
    Ok(data.chart.result.and_then(|items| items.into_iter().next()))
}

pub struct YahooFinanceProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooFinanceProvider {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        YahooFinanceProvider {
            client,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl QuoteProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooQuoteFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_quote(&self, symbol: &str) -> Result<EquityQuote, ProviderError> {
        let context = format!("symbol: {symbol}");
        fetch_chart(&self.client, &self.base_url, symbol, &context)
            .await?
            .and_then(|item| item.into_quote(symbol))
            .ok_or_else(|| ProviderError::Malformed(format!("No price data found for {context}")))
    }
}

pub struct YahooCurrencyProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooCurrencyProvider {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        YahooCurrencyProvider {
            client,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl CurrencyRateProvider for YahooCurrencyProvider {
    #[instrument(name = "YahooRateFetch", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, ProviderError> {
        let symbol = format!("{from}{to}=X");
        let context = format!("currency pair: {symbol}");
        fetch_chart(&self.client, &self.base_url, &symbol, &context)
            .await?
            .and_then(|item| item.meta.regular_market_price)
            .ok_or_else(|| ProviderError::Malformed(format!("No rate data found for {context}")))
    }
}
