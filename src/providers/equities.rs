//! Equity lists built from per-symbol quotes over a configured universe.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::exchange::{rank_by, round_to};
use crate::core::fetch::ProviderError;
use crate::core::price::{
    EquityEntry, EquityQuote, IndexSnapshot, ListedSymbol, QuoteProvider, SectorSnapshot,
    SectorTrend,
};

const DEFAULT_SYMBOL_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Clone)]
pub struct EquityScreener {
    provider: Arc<dyn QuoteProvider>,
    symbol_timeout: Duration,
}

impl EquityScreener {
    pub fn new(provider: Arc<dyn QuoteProvider>) -> Self {
        Self {
            provider,
            symbol_timeout: DEFAULT_SYMBOL_TIMEOUT,
        }
    }

    /// Budget for a single symbol. Keep it below the deadline the whole list
    /// runs under, otherwise one hung symbol discards every other quote.
    pub fn with_symbol_timeout(mut self, symbol_timeout: Duration) -> Self {
        self.symbol_timeout = symbol_timeout;
        self
    }

    async fn quote(&self, symbol: &str) -> Result<EquityQuote, ProviderError> {
        tokio::time::timeout(self.symbol_timeout, self.provider.fetch_quote(symbol))
            .await
            .map_err(|_| ProviderError::Timeout(self.symbol_timeout))?
    }

    /// Quotes every symbol concurrently, dropping the ones that fail or time
    /// out. Fails only when the universe is non-empty and not a single quote
    /// arrived.
    async fn quotes<'a>(
        &self,
        universe: &'a [ListedSymbol],
    ) -> Result<Vec<(&'a ListedSymbol, EquityQuote)>, ProviderError> {
        let results = join_all(universe.iter().map(|listed| self.quote(&listed.symbol))).await;

        let mut quotes = Vec::with_capacity(universe.len());
        let mut last_error = None;
        for (listed, result) in universe.iter().zip(results) {
            match result {
                Ok(quote) => quotes.push((listed, quote)),
                Err(err) => {
                    debug!(symbol = %listed.symbol, error = %err, "Skipping symbol without quote");
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if quotes.is_empty() => Err(err),
            _ => Ok(quotes),
        }
    }

    async fn entries(&self, universe: &[ListedSymbol]) -> Result<Vec<EquityEntry>, ProviderError> {
        Ok(self
            .quotes(universe)
            .await?
            .into_iter()
            .map(|(listed, quote)| to_entry(listed, &quote))
            .collect())
    }

    #[instrument(name = "TopByTradeValue", skip(self, universe), fields(universe = universe.len()))]
    pub async fn top_by_trade_value(
        &self,
        universe: &[ListedSymbol],
        limit: usize,
    ) -> Result<Vec<EquityEntry>, ProviderError> {
        let entries = self.entries(universe).await?;
        Ok(rank_by(entries, limit, |e| e.trade_value))
    }

    #[instrument(name = "TopByVolume", skip(self, universe), fields(universe = universe.len()))]
    pub async fn top_by_volume(
        &self,
        universe: &[ListedSymbol],
        limit: usize,
    ) -> Result<Vec<EquityEntry>, ProviderError> {
        let entries = self.entries(universe).await?;
        Ok(rank_by(entries, limit, |e| e.volume as f64))
    }

    /// Indices in configured order; those without two daily closes are skipped.
    #[instrument(name = "IndexSnapshots", skip_all)]
    pub async fn index_snapshots(
        &self,
        indices: &[ListedSymbol],
    ) -> Result<Vec<IndexSnapshot>, ProviderError> {
        Ok(self
            .quotes(indices)
            .await?
            .into_iter()
            .filter_map(|(listed, quote)| {
                IndexSnapshot::from_closes(display_name(listed, &quote), &listed.symbol, &quote.closes)
            })
            .collect())
    }

    #[instrument(name = "SectorPerformance", skip_all)]
    pub async fn sector_performance(
        &self,
        sectors: &[ListedSymbol],
    ) -> Result<Vec<SectorSnapshot>, ProviderError> {
        Ok(self
            .quotes(sectors)
            .await?
            .into_iter()
            .map(|(listed, quote)| {
                let change_rate = round_to(quote.change_rate(), 2);
                SectorSnapshot {
                    name: display_name(listed, &quote).to_string(),
                    change_rate,
                    trend: SectorTrend::from_change(change_rate),
                }
            })
            .collect())
    }
}

/// Configured name, then the upstream short name, then the bare code.
fn display_name<'a>(listed: &'a ListedSymbol, quote: &'a EquityQuote) -> &'a str {
    listed
        .name
        .as_deref()
        .or(quote.short_name.as_deref())
        .unwrap_or_else(|| listed.code())
}

fn to_entry(listed: &ListedSymbol, quote: &EquityQuote) -> EquityEntry {
    EquityEntry {
        symbol: listed.symbol.clone(),
        code: listed.code().to_string(),
        name: display_name(listed, quote).to_string(),
        price: quote.price,
        change_rate: round_to(quote.change_rate(), 2),
        volume: quote.volume,
        trade_value: quote.trade_value(),
    }
}
