//! Core market abstractions shared by providers, the dashboard and the server

pub mod cache;
pub mod config;
pub mod currency;
pub mod exchange;
pub mod feeds;
pub mod fetch;
pub mod log;
pub mod price;
pub mod reference;

// Re-export main types for cleaner imports
pub use currency::{ConversionRate, CurrencyRateProvider, RateConverter};
pub use exchange::{Exchange, ExchangeBalance, ExchangeProvider, Holding, TopVolumeEntry};
pub use feeds::{FearGreedIndex, NewsItem, NewsProvider, SentimentProvider, TransferFeed, WhaleAlert};
pub use fetch::{Fetched, ProviderError, guarded};
pub use price::{EquityEntry, EquityQuote, IndexSnapshot, QuoteProvider, SectorSnapshot};
pub use reference::{DisplayNames, Namespace, ReferenceCache, ReferenceSource};
