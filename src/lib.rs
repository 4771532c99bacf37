pub mod cli;
pub mod core;
pub mod dashboard;
pub mod providers;
pub mod server;

use crate::core::config::AppConfig;
use crate::core::currency::RateConverter;
use crate::core::exchange::Exchange;
use crate::core::reference::ReferenceCache;
use crate::dashboard::{
    CryptoDashboard, CryptoSources, DashboardSettings, StockDashboard, StockSettings, StockSources,
};
use crate::providers::{
    AlternativeMeProvider, BinanceProvider, EquityScreener, GoogleNewsProvider,
    SimulatedWhaleFeed, UpbitProvider, YahooCurrencyProvider, YahooFinanceProvider,
};
use crate::server::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Serve the HTTP API; `None` uses the configured address.
    Serve { listen: Option<String> },
    Dashboard { json: bool },
    Stocks { json: bool },
    Balance { exchange: Exchange, json: bool },
    Holdings { exchange: Exchange, json: bool },
    TopVolume {
        exchange: Exchange,
        limit: Option<usize>,
        json: bool,
    },
    News { query: String, json: bool },
}

/// Wires every adapter from `config`. All adapters share one HTTP client and
/// the market directory cache lives as long as the returned state.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let client =
        providers::util::http_client(&config.http).context("Failed to build HTTP client")?;
    let deadline = config.http.timeout();
    let dust = config.dashboard.dust_threshold;
    let endpoints = &config.providers;

    let upbit = Arc::new(UpbitProvider::new(
        client.clone(),
        &endpoints.upbit.base_url,
        config.credentials.upbit.clone(),
        ReferenceCache::new(),
        dust,
    ));
    let binance = Arc::new(BinanceProvider::new(
        client.clone(),
        &endpoints.binance.base_url,
        config.credentials.binance.clone(),
        dust,
    ));
    let quotes = Arc::new(YahooFinanceProvider::new(
        client.clone(),
        &endpoints.yahoo.base_url,
    ));
    let fx = Arc::new(YahooCurrencyProvider::new(
        client.clone(),
        &endpoints.yahoo.base_url,
    ));

    let usdt_krw = RateConverter::new(upbit.clone(), "USDT", "KRW")
        .with_fallback(config.dashboard.fallback_rate)
        .with_deadline(deadline);
    let usd_krw = RateConverter::new(fx, "USD", "KRW")
        .with_fallback(config.dashboard.fallback_rate)
        .with_deadline(deadline);

    let crypto = CryptoDashboard::new(
        CryptoSources {
            upbit,
            binance,
            sentiment: Arc::new(AlternativeMeProvider::new(
                client.clone(),
                &endpoints.fear_greed.base_url,
            )),
            transfers: Arc::new(SimulatedWhaleFeed::new()),
            usdt_krw,
        },
        DashboardSettings::from_config(config),
    );
    let stocks = StockDashboard::new(
        StockSources {
            screener: EquityScreener::new(quotes).with_symbol_timeout(deadline.mul_f64(0.8)),
            news: Arc::new(GoogleNewsProvider::new(client, &endpoints.news.base_url)),
            usd_krw,
        },
        StockSettings::from_config(config),
    );

    Ok(AppState { crypto, stocks })
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let state = build_state(&config)?;

    match command {
        AppCommand::Serve { listen } => {
            let listen_addr = listen.unwrap_or_else(|| config.server.listen_addr.clone());
            info!(%listen_addr, "Starting dashboard API");
            server::serve(Arc::new(state), &config.server, &listen_addr).await
        }
        AppCommand::Dashboard { json } => cli::dashboard::run(&state.crypto, json).await,
        AppCommand::Stocks { json } => cli::stocks::run(&state.stocks, json).await,
        AppCommand::Balance { exchange, json } => {
            cli::dashboard::balance(&state.crypto, exchange, json).await
        }
        AppCommand::Holdings { exchange, json } => {
            cli::dashboard::holdings(&state.crypto, exchange, json).await
        }
        AppCommand::TopVolume {
            exchange,
            limit,
            json,
        } => {
            let limit = limit
                .unwrap_or(state.crypto.settings().top_volume_limit)
                .max(1);
            cli::dashboard::top_volume(&state.crypto, exchange, limit, json).await
        }
        AppCommand::News { query, json } => cli::stocks::news(&state.stocks, &query, json).await,
    }
}
