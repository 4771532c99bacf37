//! Currency conversion abstractions

use crate::core::fetch::{Fetched, ProviderError, guarded};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

/// Spot rate used when no live quote can be obtained.
pub const FALLBACK_KRW_RATE: f64 = 1450.0;

const DEFAULT_RATE_DEADLINE: Duration = Duration::from_secs(5);

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Live,
    Fallback,
}

/// A single positive conversion factor, fixed for one aggregation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionRate {
    value: f64,
    source: RateSource,
}

impl ConversionRate {
    /// Accepts only finite, strictly positive rates.
    pub fn live(value: f64) -> Option<Self> {
        is_usable(value).then_some(Self {
            value,
            source: RateSource::Live,
        })
    }

    pub fn fallback(value: f64) -> Self {
        let value = if is_usable(value) {
            value
        } else {
            FALLBACK_KRW_RATE
        };
        Self {
            value,
            source: RateSource::Fallback,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn source(&self) -> RateSource {
        self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == RateSource::Fallback
    }

    pub fn convert(&self, amount: f64) -> f64 {
        amount * self.value
    }
}

fn is_usable(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// Resolves the rate for one currency pair, substituting a fixed fallback
/// whenever the upstream quote is missing or unusable.
pub struct RateConverter {
    provider: Arc<dyn CurrencyRateProvider>,
    from: String,
    to: String,
    fallback: f64,
    deadline: Duration,
}

impl RateConverter {
    pub fn new(provider: Arc<dyn CurrencyRateProvider>, from: &str, to: &str) -> Self {
        Self {
            provider,
            from: from.to_string(),
            to: to.to_string(),
            fallback: FALLBACK_KRW_RATE,
            deadline: DEFAULT_RATE_DEADLINE,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        if is_usable(fallback) {
            self.fallback = fallback;
        } else {
            warn!(fallback, "Ignoring unusable fallback rate");
        }
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn pair(&self) -> String {
        format!("{}/{}", self.from, self.to)
    }

    #[instrument(name = "RateLookup", skip(self), fields(pair = %self.pair()))]
    pub async fn current_rate(&self) -> ConversionRate {
        let fetched = guarded(
            "rate",
            self.deadline,
            self.provider.get_rate(&self.from, &self.to),
        )
        .await;

        match fetched {
            Fetched::Present(value) => ConversionRate::live(value).unwrap_or_else(|| {
                warn!(value, "Upstream rate is not positive, using fallback");
                ConversionRate::fallback(self.fallback)
            }),
            Fetched::Absent(_) => ConversionRate::fallback(self.fallback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRate {
        rate: Result<f64, ProviderError>,
        calls: AtomicUsize,
    }

    impl FixedRate {
        fn new(rate: Result<f64, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                rate,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CurrencyRateProvider for FixedRate {
        async fn get_rate(&self, _from: &str, _to: &str) -> Result<f64, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rate.clone()
        }
    }

    #[tokio::test]
    async fn test_live_rate_is_used() {
        let provider = FixedRate::new(Ok(1382.5));
        let converter = RateConverter::new(provider.clone(), "USDT", "KRW");

        let rate = converter.current_rate().await;
        assert_eq!(rate.value(), 1382.5);
        assert_eq!(rate.source(), RateSource::Live);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_uses_fallback() {
        let provider = FixedRate::new(Err(ProviderError::Transport("timeout".to_string())));
        let converter = RateConverter::new(provider, "USDT", "KRW");

        let rate = converter.current_rate().await;
        assert_eq!(rate.value(), FALLBACK_KRW_RATE);
        assert!(rate.is_fallback());
    }

    #[tokio::test]
    async fn test_non_positive_rates_use_fallback() {
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let converter =
                RateConverter::new(FixedRate::new(Ok(bad)), "USD", "KRW").with_fallback(1300.0);
            let rate = converter.current_rate().await;
            assert_eq!(rate.value(), 1300.0, "rate {bad} should fall back");
            assert!(rate.is_fallback());
        }
    }

    #[test]
    fn test_unusable_fallback_is_ignored() {
        let converter = RateConverter::new(FixedRate::new(Ok(1.0)), "USD", "KRW").with_fallback(0.0);
        assert_eq!(converter.fallback, FALLBACK_KRW_RATE);
        assert_eq!(ConversionRate::fallback(-1.0).value(), FALLBACK_KRW_RATE);
    }

    #[test]
    fn test_convert_multiplies_by_rate() {
        let rate = ConversionRate::live(1400.0).unwrap();
        assert_eq!(rate.convert(2.5), 3500.0);
        assert!(ConversionRate::live(0.0).is_none());
    }
}
