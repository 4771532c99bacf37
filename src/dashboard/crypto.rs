//! Crypto dashboard orchestrator: fans out to both exchanges and the side
//! feeds, joins every call, then assembles one snapshot under one rate.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use crate::core::config::AppConfig;
use crate::core::currency::RateConverter;
use crate::core::exchange::{Exchange, ExchangeProvider};
use crate::core::feeds::{SentimentProvider, TransferFeed};
use crate::core::fetch::guarded;
use crate::dashboard::assemble::{self, AssemblyError, map_list, present_list};
use crate::dashboard::schema::{
    BalanceView, DashboardData, FearGreedView, HoldingsView, TopVolumeView, WhaleAlertView,
};

pub struct CryptoSources {
    pub upbit: Arc<dyn ExchangeProvider>,
    pub binance: Arc<dyn ExchangeProvider>,
    pub sentiment: Arc<dyn SentimentProvider>,
    pub transfers: Arc<dyn TransferFeed>,
    /// USDT to KRW.
    pub usdt_krw: RateConverter,
}

#[derive(Debug, Clone, Copy)]
pub struct DashboardSettings {
    /// Per-call deadline applied to every provider.
    pub deadline: Duration,
    pub top_volume_limit: usize,
    pub whale_alert_limit: usize,
}

impl DashboardSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            deadline: config.http.timeout(),
            top_volume_limit: config.dashboard.top_volume_limit,
            whale_alert_limit: config.dashboard.whale_alert_limit,
        }
    }
}

pub struct CryptoDashboard {
    sources: CryptoSources,
    settings: DashboardSettings,
}

impl CryptoDashboard {
    pub fn new(sources: CryptoSources, settings: DashboardSettings) -> Self {
        Self { sources, settings }
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    fn exchange(&self, exchange: Exchange) -> &dyn ExchangeProvider {
        match exchange {
            Exchange::Upbit => self.sources.upbit.as_ref(),
            Exchange::Binance => self.sources.binance.as_ref(),
        }
    }

    /// Every source is queried once, concurrently. A failing source leaves
    /// its own field `null`; only assembly itself can fail the call.
    #[instrument(name = "BuildDashboard", skip(self))]
    pub async fn build(&self) -> Result<DashboardData, AssemblyError> {
        let deadline = self.settings.deadline;
        let limit = self.settings.top_volume_limit;
        let upbit = &self.sources.upbit;
        let binance = &self.sources.binance;

        let (
            rate,
            upbit_balance,
            upbit_holdings,
            upbit_top_volume,
            binance_balance,
            binance_holdings,
            binance_top_volume,
            fear_greed,
            whale_alerts,
        ) = tokio::join!(
            self.sources.usdt_krw.current_rate(),
            guarded("upbit.balance", deadline, upbit.fetch_balance()),
            guarded("upbit.holdings", deadline, upbit.fetch_holdings()),
            guarded("upbit.top_volume", deadline, upbit.fetch_top_volume(limit)),
            guarded("binance.balance", deadline, binance.fetch_balance()),
            guarded("binance.holdings", deadline, binance.fetch_holdings()),
            guarded("binance.top_volume", deadline, binance.fetch_top_volume(limit)),
            guarded("fear_greed", deadline, self.sources.sentiment.fetch_fear_greed()),
            guarded(
                "whale_alerts",
                deadline,
                self.sources
                    .transfers
                    .recent_transfers(self.settings.whale_alert_limit)
            ),
        );

        // Resolved once above; every converted field below uses this value
        let rate = assemble::checked_rate(rate)?;

        let data = DashboardData {
            upbit_balance: upbit_balance.present().map(|b| assemble::upbit_balance(&b)),
            upbit_holdings: present_list(upbit_holdings)
                .map(|h| h.iter().map(assemble::upbit_holding).collect()),
            upbit_top_volume: present_list(upbit_top_volume)
                .map(|t| t.iter().map(assemble::upbit_top_coin).collect()),
            binance_balance: binance_balance
                .present()
                .map(|b| assemble::binance_balance(&b)),
            binance_holdings: present_list(binance_holdings)
                .map(|h| h.iter().map(assemble::binance_holding).collect()),
            binance_top_volume: map_list(binance_top_volume, |e| {
                assemble::binance_top_coin(e, &rate)
            })?,
            fear_greed: fear_greed.present().map(|f| assemble::fear_greed(&f)),
            whale_alerts: present_list(whale_alerts)
                .map(|w| w.iter().map(assemble::whale_alert).collect()),
            usdt_krw_rate: assemble::rate_view(&rate),
            last_updated: Utc::now(),
        };

        let missing = [
            data.upbit_balance.is_none(),
            data.upbit_holdings.is_none(),
            data.upbit_top_volume.is_none(),
            data.binance_balance.is_none(),
            data.binance_holdings.is_none(),
            data.binance_top_volume.is_none(),
            data.fear_greed.is_none(),
            data.whale_alerts.is_none(),
        ]
        .iter()
        .filter(|m| **m)
        .count();
        info!(missing, rate = rate.value(), "Dashboard assembled");
        Ok(data)
    }

    pub async fn balance(&self, exchange: Exchange) -> Option<BalanceView> {
        let balance = guarded(
            &format!("{exchange}.balance"),
            self.settings.deadline,
            self.exchange(exchange).fetch_balance(),
        )
        .await
        .present()?;

        Some(match exchange {
            Exchange::Upbit => BalanceView::Upbit(assemble::upbit_balance(&balance)),
            Exchange::Binance => BalanceView::Binance(assemble::binance_balance(&balance)),
        })
    }

    pub async fn holdings(&self, exchange: Exchange) -> Option<HoldingsView> {
        let holdings = guarded(
            &format!("{exchange}.holdings"),
            self.settings.deadline,
            self.exchange(exchange).fetch_holdings(),
        )
        .await;
        let holdings = present_list(holdings)?;

        Some(match exchange {
            Exchange::Upbit => {
                HoldingsView::Upbit(holdings.iter().map(assemble::upbit_holding).collect())
            }
            Exchange::Binance => {
                HoldingsView::Binance(holdings.iter().map(assemble::binance_holding).collect())
            }
        })
    }

    pub async fn top_volume(
        &self,
        exchange: Exchange,
        limit: usize,
    ) -> Result<Option<TopVolumeView>, AssemblyError> {
        let source = format!("{exchange}.top_volume");
        let fetch = guarded(
            &source,
            self.settings.deadline,
            self.exchange(exchange).fetch_top_volume(limit),
        );

        match exchange {
            Exchange::Upbit => Ok(present_list(fetch.await)
                .map(|t| TopVolumeView::Upbit(t.iter().map(assemble::upbit_top_coin).collect()))),
            Exchange::Binance => {
                let (rate, entries) = tokio::join!(self.sources.usdt_krw.current_rate(), fetch);
                let rate = assemble::checked_rate(rate)?;
                Ok(map_list(entries, |e| assemble::binance_top_coin(e, &rate))?
                    .map(TopVolumeView::Binance))
            }
        }
    }

    pub async fn fear_greed(&self) -> Option<FearGreedView> {
        guarded(
            "fear_greed",
            self.settings.deadline,
            self.sources.sentiment.fetch_fear_greed(),
        )
        .await
        .present()
        .map(|f| assemble::fear_greed(&f))
    }

    pub async fn whale_alerts(&self) -> Option<Vec<WhaleAlertView>> {
        let alerts = guarded(
            "whale_alerts",
            self.settings.deadline,
            self.sources
                .transfers
                .recent_transfers(self.settings.whale_alert_limit),
        )
        .await;
        present_list(alerts).map(|w| w.iter().map(assemble::whale_alert).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::{CurrencyRateProvider, FALLBACK_KRW_RATE, RateSource};
    use crate::core::exchange::{ExchangeBalance, Holding, TopVolumeEntry};
    use crate::core::feeds::{FearGreedIndex, WhaleAlert};
    use crate::core::fetch::ProviderError;
    use crate::core::reference::DisplayNames;
    use async_trait::async_trait;

    #[derive(Clone)]
    struct MockExchange {
        exchange: Exchange,
        balance: Result<ExchangeBalance, ProviderError>,
        holdings: Result<Vec<Holding>, ProviderError>,
        top_volume: Result<Vec<TopVolumeEntry>, ProviderError>,
        delay: Option<Duration>,
    }

    impl MockExchange {
        fn healthy(exchange: Exchange) -> Self {
            let (asset, price) = match exchange {
                Exchange::Upbit => ("BTC", 100_000_000.0),
                Exchange::Binance => ("ETH", 3_000.0),
            };
            Self {
                exchange,
                balance: Ok(ExchangeBalance::new(1000.0, 250.0)),
                holdings: Ok(vec![Holding::new(asset, 1.0, 0.0, Some(price), Some(price))]),
                top_volume: Ok(vec![
                    top_entry(&format!("{asset}-A"), 42.5, 700.0),
                    top_entry(&format!("{asset}-B"), 3.25, 500.0),
                ]),
                delay: None,
            }
        }

        fn without_credentials(mut self) -> Self {
            let name = match self.exchange {
                Exchange::Upbit => "upbit",
                Exchange::Binance => "binance",
            };
            self.balance = Err(ProviderError::MissingCredential(name));
            self.holdings = Err(ProviderError::MissingCredential(name));
            self
        }

        async fn pause(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    fn top_entry(symbol: &str, price: f64, quote_volume: f64) -> TopVolumeEntry {
        TopVolumeEntry {
            symbol: symbol.to_string(),
            base_asset: symbol.to_string(),
            names: DisplayNames::fallback(symbol),
            current_price: price,
            change_rate_percent: 1.5,
            base_volume: quote_volume / price,
            quote_volume,
        }
    }

    #[async_trait]
    impl ExchangeProvider for MockExchange {
        fn exchange(&self) -> Exchange {
            self.exchange
        }

        async fn fetch_balance(&self) -> Result<ExchangeBalance, ProviderError> {
            self.pause().await;
            self.balance.clone()
        }

        async fn fetch_holdings(&self) -> Result<Vec<Holding>, ProviderError> {
            self.pause().await;
            self.holdings.clone()
        }

        async fn fetch_top_volume(&self, limit: usize) -> Result<Vec<TopVolumeEntry>, ProviderError> {
            self.pause().await;
            self.top_volume
                .clone()
                .map(|entries| entries.into_iter().take(limit).collect())
        }
    }

    struct MockSentiment(Result<FearGreedIndex, ProviderError>);

    #[async_trait]
    impl SentimentProvider for MockSentiment {
        async fn fetch_fear_greed(&self) -> Result<FearGreedIndex, ProviderError> {
            self.0.clone()
        }
    }

    struct MockTransfers;

    #[async_trait]
    impl TransferFeed for MockTransfers {
        async fn recent_transfers(&self, limit: usize) -> Result<Vec<WhaleAlert>, ProviderError> {
            Ok((0..limit)
                .map(|i| WhaleAlert {
                    coin: "BTC".to_string(),
                    amount: 1000.0 + i as f64,
                    sender: "Binance".to_string(),
                    receiver: "Wallet".to_string(),
                    value_usd: (1000.0 + i as f64) * 50_000.0,
                    timestamp: Utc::now(),
                })
                .collect())
        }
    }

    struct FailingTransfers;

    #[async_trait]
    impl TransferFeed for FailingTransfers {
        async fn recent_transfers(&self, _limit: usize) -> Result<Vec<WhaleAlert>, ProviderError> {
            Err(ProviderError::Malformed("feed unavailable".to_string()))
        }
    }

    struct MockRate(Result<f64, ProviderError>);

    #[async_trait]
    impl CurrencyRateProvider for MockRate {
        async fn get_rate(&self, _from: &str, _to: &str) -> Result<f64, ProviderError> {
            self.0.clone()
        }
    }

    fn dashboard_with(
        upbit: MockExchange,
        binance: MockExchange,
        rate: Result<f64, ProviderError>,
    ) -> CryptoDashboard {
        let sources = CryptoSources {
            upbit: Arc::new(upbit),
            binance: Arc::new(binance),
            sentiment: Arc::new(MockSentiment(Ok(FearGreedIndex {
                value: 55,
                value_classification: "Greed".to_string(),
                timestamp: 1_718_064_000,
            }))),
            transfers: Arc::new(MockTransfers),
            usdt_krw: RateConverter::new(Arc::new(MockRate(rate)), "USDT", "KRW"),
        };
        CryptoDashboard::new(
            sources,
            DashboardSettings {
                deadline: Duration::from_secs(5),
                top_volume_limit: 10,
                whale_alert_limit: 3,
            },
        )
    }

    fn assert_binance_rate(data: &DashboardData, expected: f64) {
        let coins = data.binance_top_volume.as_ref().expect("binance top volume");
        assert!(!coins.is_empty());
        for coin in coins {
            assert!((coin.current_price_krw / coin.current_price - expected).abs() < 1e-9);
            assert!((coin.quote_volume_krw / coin.quote_volume - expected).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_all_sources_present() {
        let dashboard = dashboard_with(
            MockExchange::healthy(Exchange::Upbit),
            MockExchange::healthy(Exchange::Binance),
            Ok(1390.0),
        );

        let data = dashboard.build().await.unwrap();
        assert_eq!(data.upbit_balance.as_ref().unwrap().total_krw, 1250.0);
        assert_eq!(data.upbit_holdings.as_ref().unwrap().len(), 1);
        assert_eq!(data.upbit_top_volume.as_ref().unwrap().len(), 2);
        assert_eq!(data.binance_balance.as_ref().unwrap().total_usdt, 1250.0);
        assert_eq!(data.binance_holdings.as_ref().unwrap()[0].asset, "ETH");
        assert_eq!(data.fear_greed.as_ref().unwrap().value, 55);
        assert_eq!(data.whale_alerts.as_ref().unwrap().len(), 3);
        assert_eq!(data.usdt_krw_rate.value, 1390.0);
        assert_eq!(data.usdt_krw_rate.source, RateSource::Live);
        assert_binance_rate(&data, 1390.0);
    }

    #[tokio::test]
    async fn test_single_failing_provider_only_nulls_its_field() {
        let mut upbit = MockExchange::healthy(Exchange::Upbit);
        upbit.top_volume = Err(ProviderError::Transport("connection reset".to_string()));
        let dashboard = dashboard_with(upbit, MockExchange::healthy(Exchange::Binance), Ok(1390.0));

        let data = dashboard.build().await.unwrap();
        assert!(data.upbit_top_volume.is_none());
        assert!(data.upbit_balance.is_some());
        assert!(data.upbit_holdings.is_some());
        assert!(data.binance_balance.is_some());
        assert!(data.binance_holdings.is_some());
        assert!(data.binance_top_volume.is_some());
        assert!(data.fear_greed.is_some());
        assert!(data.whale_alerts.is_some());
    }

    #[tokio::test]
    async fn test_missing_credentials_keep_public_fields() {
        let dashboard = dashboard_with(
            MockExchange::healthy(Exchange::Upbit).without_credentials(),
            MockExchange::healthy(Exchange::Binance),
            Ok(1390.0),
        );

        let data = dashboard.build().await.unwrap();
        assert!(data.upbit_balance.is_none());
        assert!(data.upbit_holdings.is_none());
        assert!(data.upbit_top_volume.is_some());
        assert!(data.binance_balance.is_some());
        assert!(data.binance_holdings.is_some());
        assert!(data.binance_top_volume.is_some());
    }

    #[tokio::test]
    async fn test_failed_rate_uses_fallback_everywhere() {
        let dashboard = dashboard_with(
            MockExchange::healthy(Exchange::Upbit),
            MockExchange::healthy(Exchange::Binance),
            Err(ProviderError::Transport("down".to_string())),
        );

        let data = dashboard.build().await.unwrap();
        assert_eq!(data.usdt_krw_rate.value, FALLBACK_KRW_RATE);
        assert_eq!(data.usdt_krw_rate.source, RateSource::Fallback);
        assert_binance_rate(&data, FALLBACK_KRW_RATE);

        let standalone = dashboard.top_volume(Exchange::Binance, 10).await.unwrap();
        match standalone {
            Some(TopVolumeView::Binance(coins)) => {
                assert_eq!(coins[0].current_price_krw, coins[0].current_price * FALLBACK_KRW_RATE)
            }
            other => panic!("unexpected top volume view: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_everything_failing_is_still_a_response() {
        let failing = |exchange| MockExchange {
            exchange,
            balance: Err(ProviderError::Timeout(Duration::from_secs(5))),
            holdings: Err(ProviderError::Malformed("bad".to_string())),
            top_volume: Err(ProviderError::Transport("down".to_string())),
            delay: None,
        };
        let mut dashboard = dashboard_with(
            failing(Exchange::Upbit),
            failing(Exchange::Binance),
            Err(ProviderError::Transport("down".to_string())),
        );
        dashboard.sources.sentiment =
            Arc::new(MockSentiment(Err(ProviderError::Transport("down".to_string()))));
        dashboard.sources.transfers = Arc::new(FailingTransfers);

        let data = dashboard.build().await.unwrap();
        assert!(data.upbit_balance.is_none());
        assert!(data.upbit_holdings.is_none());
        assert!(data.upbit_top_volume.is_none());
        assert!(data.binance_balance.is_none());
        assert!(data.binance_holdings.is_none());
        assert!(data.binance_top_volume.is_none());
        assert!(data.fear_greed.is_none());
        assert!(data.whale_alerts.is_none());
    }

    #[tokio::test]
    async fn test_empty_whale_feed_is_null() {
        let mut dashboard = dashboard_with(
            MockExchange::healthy(Exchange::Upbit),
            MockExchange::healthy(Exchange::Binance),
            Ok(1390.0),
        );
        dashboard.settings.whale_alert_limit = 0;

        let data = dashboard.build().await.unwrap();
        assert!(data.whale_alerts.is_none());
        assert!(data.upbit_top_volume.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out_alone() {
        let mut binance = MockExchange::healthy(Exchange::Binance);
        binance.delay = Some(Duration::from_secs(30));
        let dashboard = dashboard_with(MockExchange::healthy(Exchange::Upbit), binance, Ok(1390.0));

        let data = dashboard.build().await.unwrap();
        assert!(data.binance_balance.is_none());
        assert!(data.binance_holdings.is_none());
        assert!(data.binance_top_volume.is_none());
        assert!(data.upbit_balance.is_some());
        assert!(data.upbit_top_volume.is_some());
    }

    #[tokio::test]
    async fn test_per_exchange_views() {
        let dashboard = dashboard_with(
            MockExchange::healthy(Exchange::Upbit),
            MockExchange::healthy(Exchange::Binance).without_credentials(),
            Ok(1390.0),
        );

        assert!(matches!(
            dashboard.balance(Exchange::Upbit).await,
            Some(BalanceView::Upbit(_))
        ));
        assert!(dashboard.balance(Exchange::Binance).await.is_none());
        assert!(dashboard.holdings(Exchange::Binance).await.is_none());

        match dashboard.top_volume(Exchange::Upbit, 1).await.unwrap() {
            Some(TopVolumeView::Upbit(coins)) => assert_eq!(coins.len(), 1),
            other => panic!("unexpected top volume view: {other:?}"),
        }
        assert_eq!(dashboard.whale_alerts().await.unwrap().len(), 3);
    }
}
