//! Companion stock dashboard orchestrator.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use crate::core::config::{AppConfig, StocksConfig};
use crate::core::currency::RateConverter;
use crate::core::feeds::NewsProvider;
use crate::core::fetch::guarded;
use crate::core::price::ListedSymbol;
use crate::dashboard::assemble::{self, AssemblyError, map_list, present_list};
use crate::dashboard::schema::{
    EtfView, KoreaStockView, NewsView, SectorView, StockDashboardData, StockIndexView, UsStockView,
};
use crate::providers::equities::EquityScreener;

pub struct StockSources {
    pub screener: EquityScreener,
    pub news: Arc<dyn NewsProvider>,
    /// USD to KRW.
    pub usd_krw: RateConverter,
}

#[derive(Debug, Clone)]
pub struct StockSettings {
    pub deadline: Duration,
    pub list_limit: usize,
    pub news_query: String,
    pub news_limit: usize,
    pub universes: StocksConfig,
}

impl StockSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            deadline: config.http.timeout(),
            list_limit: config.stocks.list_limit,
            news_query: config.dashboard.news_query.clone(),
            news_limit: config.dashboard.news_limit,
            universes: config.stocks.clone(),
        }
    }
}

pub struct StockDashboard {
    sources: StockSources,
    settings: StockSettings,
}

impl StockDashboard {
    pub fn new(sources: StockSources, settings: StockSettings) -> Self {
        Self { sources, settings }
    }

    pub fn settings(&self) -> &StockSettings {
        &self.settings
    }

    #[instrument(name = "BuildStockDashboard", skip(self))]
    pub async fn build(&self) -> Result<StockDashboardData, AssemblyError> {
        let deadline = self.settings.deadline;
        let limit = self.settings.list_limit;
        let universes = &self.settings.universes;
        let screener = &self.sources.screener;

        let (rate, kospi, kosdaq, us, indices, sectors, etfs, news) = tokio::join!(
            self.sources.usd_krw.current_rate(),
            guarded("stock.kospi", deadline, screener.top_by_trade_value(&universes.kospi, limit)),
            guarded("stock.kosdaq", deadline, screener.top_by_trade_value(&universes.kosdaq, limit)),
            guarded("stock.us", deadline, screener.top_by_trade_value(&universes.us, limit)),
            guarded("stock.indices", deadline, screener.index_snapshots(&universes.indices)),
            guarded("stock.sectors", deadline, screener.sector_performance(&universes.sectors)),
            guarded("stock.etf", deadline, screener.top_by_volume(&universes.etf, limit)),
            guarded(
                "stock.news",
                deadline,
                self.sources
                    .news
                    .fetch_news(&self.settings.news_query, self.settings.news_limit)
            ),
        );

        let rate = assemble::checked_rate(rate)?;

        let data = StockDashboardData {
            kospi_top: present_list(kospi).map(|s| s.iter().map(assemble::korea_stock).collect()),
            kosdaq_top: present_list(kosdaq).map(|s| s.iter().map(assemble::korea_stock).collect()),
            us_top: map_list(us, |e| assemble::us_stock(e, &rate))?,
            indices: present_list(indices).map(|i| i.iter().map(assemble::stock_index).collect()),
            sectors: present_list(sectors).map(|s| s.iter().map(assemble::sector).collect()),
            etf_ranking: map_list(etfs, |e| assemble::us_stock(e, &rate))?,
            news: present_list(news).map(|n| n.iter().map(assemble::news).collect()),
            usd_krw_rate: assemble::rate_view(&rate),
            last_updated: Utc::now(),
        };
        info!(rate = rate.value(), "Stock dashboard assembled");
        Ok(data)
    }

    async fn korea_list(
        &self,
        source: &str,
        universe: &[ListedSymbol],
        limit: usize,
    ) -> Option<Vec<KoreaStockView>> {
        let entries = guarded(
            source,
            self.settings.deadline,
            self.sources.screener.top_by_trade_value(universe, limit),
        )
        .await;
        present_list(entries).map(|s| s.iter().map(assemble::korea_stock).collect())
    }

    pub async fn kospi(&self, limit: usize) -> Option<Vec<KoreaStockView>> {
        self.korea_list("stock.kospi", &self.settings.universes.kospi, limit)
            .await
    }

    pub async fn kosdaq(&self, limit: usize) -> Option<Vec<KoreaStockView>> {
        self.korea_list("stock.kosdaq", &self.settings.universes.kosdaq, limit)
            .await
    }

    pub async fn us(&self, limit: usize) -> Result<Option<Vec<UsStockView>>, AssemblyError> {
        let (rate, entries) = tokio::join!(
            self.sources.usd_krw.current_rate(),
            guarded(
                "stock.us",
                self.settings.deadline,
                self.sources
                    .screener
                    .top_by_trade_value(&self.settings.universes.us, limit)
            ),
        );
        let rate = assemble::checked_rate(rate)?;
        map_list(entries, |e| assemble::us_stock(e, &rate))
    }

    pub async fn etf(&self, limit: usize) -> Result<Option<Vec<EtfView>>, AssemblyError> {
        let (rate, entries) = tokio::join!(
            self.sources.usd_krw.current_rate(),
            guarded(
                "stock.etf",
                self.settings.deadline,
                self.sources
                    .screener
                    .top_by_volume(&self.settings.universes.etf, limit)
            ),
        );
        let rate = assemble::checked_rate(rate)?;
        map_list(entries, |e| assemble::us_stock(e, &rate))
    }

    pub async fn indices(&self) -> Option<Vec<StockIndexView>> {
        let snapshots = guarded(
            "stock.indices",
            self.settings.deadline,
            self.sources
                .screener
                .index_snapshots(&self.settings.universes.indices),
        )
        .await;
        present_list(snapshots).map(|i| i.iter().map(assemble::stock_index).collect())
    }

    pub async fn sectors(&self) -> Option<Vec<SectorView>> {
        let snapshots = guarded(
            "stock.sectors",
            self.settings.deadline,
            self.sources
                .screener
                .sector_performance(&self.settings.universes.sectors),
        )
        .await;
        present_list(snapshots).map(|s| s.iter().map(assemble::sector).collect())
    }

    pub async fn news(&self, query: &str) -> Option<Vec<NewsView>> {
        let items = guarded(
            "stock.news",
            self.settings.deadline,
            self.sources.news.fetch_news(query, self.settings.news_limit),
        )
        .await;
        present_list(items).map(|n| n.iter().map(assemble::news).collect())
    }
}
