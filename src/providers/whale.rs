//! Simulated large-transfer feed. No public whale-alert API is wired in; the
//! feed produces plausible transfers so the dashboard field is exercised.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::core::feeds::{TransferFeed, WhaleAlert};
use crate::core::fetch::ProviderError;

const COINS: [&str; 6] = ["BTC", "ETH", "XRP", "USDT", "SOL", "DOGE"];
const PARTIES: [&str; 5] = ["Binance", "Coinbase", "Upbit", "Kraken", "Unknown Wallet"];
const SELF_TRANSFER_RECEIVER: &str = "Wallet";

/// Rough USD value per unit used to size a simulated transfer.
fn usd_per_unit(coin: &str) -> f64 {
    match coin {
        "BTC" => 50_000.0,
        "ETH" => 3_000.0,
        _ => 1.0,
    }
}

fn simulate<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>, limit: usize) -> Vec<WhaleAlert> {
    let mut alerts: Vec<WhaleAlert> = (0..limit)
        .map(|_| {
            let coin = *COINS.choose(rng).unwrap_or(&COINS[0]);
            let amount = rng.gen_range(1_000..=100_000) as f64;
            let sender = *PARTIES.choose(rng).unwrap_or(&PARTIES[0]);
            let receiver = *PARTIES.choose(rng).unwrap_or(&PARTIES[0]);
            let receiver = if receiver == sender {
                SELF_TRANSFER_RECEIVER
            } else {
                receiver
            };
            WhaleAlert {
                coin: coin.to_string(),
                amount,
                sender: sender.to_string(),
                receiver: receiver.to_string(),
                value_usd: amount * usd_per_unit(coin),
                timestamp: now - Duration::minutes(rng.gen_range(1..=60)),
            }
        })
        .collect();
    alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    alerts
}

#[derive(Debug, Default)]
pub struct SimulatedWhaleFeed;

impl SimulatedWhaleFeed {
    pub fn new() -> Self {
        SimulatedWhaleFeed
    }
}

#[async_trait]
impl TransferFeed for SimulatedWhaleFeed {
    async fn recent_transfers(&self, limit: usize) -> Result<Vec<WhaleAlert>, ProviderError> {
        Ok(simulate(&mut rand::thread_rng(), Utc::now(), limit))
    }
}
